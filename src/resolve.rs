use crate::error::Result;
use crate::matcher::{MatchStatus, Matcher, RankedCandidate};
use crate::normalize::normalize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use log::{info, warn};
use std::collections::HashMap;

/// Operator decision for one ambiguous or unmatched query.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Pick the candidate at this index in the full candidate set.
    Select(usize),
    /// Use a new canonical value not present in the candidate set.
    New(String),
    /// Leave the query unmatched; it must stay visible in the output.
    Skip,
}

/// Source of operator decisions. The production implementation prompts on
/// the terminal; tests supply scripted decisions.
pub trait ResolutionProvider {
    fn decide(
        &mut self,
        query: &str,
        candidates: &[String],
        ranked: &[RankedCandidate],
    ) -> Result<Decision>;
}

/// Interactive prompt on stdin/stdout.
pub struct ConsolePrompter;

impl ResolutionProvider for ConsolePrompter {
    fn decide(
        &mut self,
        query: &str,
        candidates: &[String],
        ranked: &[RankedCandidate],
    ) -> Result<Decision> {
        let mut items: Vec<String> = ranked
            .iter()
            .map(|r| format!("{} (score: {:.0}%)", candidates[r.index], r.score * 100.0))
            .collect();
        items.push("Enter a new value".to_string());
        items.push("Skip (leave unmatched)".to_string());
        let prompt = if ranked.is_empty() {
            format!("No reasonable match for '{}'", query)
        } else {
            format!("No confident match for '{}'", query)
        };
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(&items)
            .default(0)
            .interact()?;
        if selection < ranked.len() {
            Ok(Decision::Select(ranked[selection].index))
        } else if selection == ranked.len() {
            let value: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("New value for '{}'", query))
                .interact_text()?;
            Ok(Decision::New(value))
        } else {
            Ok(Decision::Skip)
        }
    }
}

/// Outcome of resolving one query against the candidate set.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched { index: usize, status: MatchStatus },
    New(String),
    Unresolved,
}

/// Matches queries against one fixed candidate set, asking the provider for
/// anything the matcher could not settle. Decisions are remembered in an
/// alias registry so an identical query never re-prompts within a run.
pub struct Resolver {
    matcher: Matcher,
    /// Original display forms, shown at the prompt.
    display: Vec<String>,
    /// Matching keys, same order as `display`.
    normalized: Vec<String>,
    aliases: HashMap<String, Resolution>,
}

impl Resolver {
    pub fn new(matcher: Matcher, display: Vec<String>) -> Resolver {
        let normalized = display.iter().map(|d| normalize(d)).collect();
        Resolver {
            matcher,
            display,
            normalized,
            aliases: HashMap::new(),
        }
    }

    /// Resolver over explicit (display, key) pairs, for candidate sets whose
    /// matching key is not the display form (e.g. short codes).
    pub fn with_keys(matcher: Matcher, entries: Vec<(String, String)>) -> Resolver {
        let (display, raw_keys): (Vec<String>, Vec<String>) = entries.into_iter().unzip();
        let normalized = raw_keys.iter().map(|k| normalize(k)).collect();
        Resolver {
            matcher,
            display,
            normalized,
            aliases: HashMap::new(),
        }
    }

    pub fn resolve(
        &mut self,
        raw: &str,
        provider: &mut dyn ResolutionProvider,
    ) -> Result<Resolution> {
        let key = normalize(raw);
        if let Some(found) = self.aliases.get(&key) {
            return Ok(found.clone());
        }
        let result = self.matcher.best_match(&key, &self.normalized);
        let resolution = match (result.status, result.best) {
            (MatchStatus::AutoMatched, Some(best)) => Resolution::Matched {
                index: best.index,
                status: MatchStatus::AutoMatched,
            },
            _ => match provider.decide(raw, &self.display, &result.ranked)? {
                Decision::Select(index) => {
                    info!("'{}' manually resolved to '{}'", raw, self.display[index]);
                    Resolution::Matched {
                        index,
                        status: MatchStatus::ManuallyResolved,
                    }
                }
                Decision::New(value) => {
                    info!("'{}' manually resolved to new value '{}'", raw, value);
                    Resolution::New(value)
                }
                Decision::Skip => {
                    warn!("'{}' left unresolved", raw);
                    Resolution::Unresolved
                }
            },
        };
        self.aliases.insert(key, resolution.clone());
        Ok(resolution)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted decisions for tests; records how often it was consulted.
    pub struct ScriptedProvider {
        pub decisions: VecDeque<Decision>,
        pub calls: usize,
    }

    impl ScriptedProvider {
        pub fn new(decisions: Vec<Decision>) -> ScriptedProvider {
            ScriptedProvider {
                decisions: decisions.into(),
                calls: 0,
            }
        }
    }

    impl ResolutionProvider for ScriptedProvider {
        fn decide(
            &mut self,
            _query: &str,
            _candidates: &[String],
            _ranked: &[RankedCandidate],
        ) -> Result<Decision> {
            self.calls += 1;
            Ok(self.decisions.pop_front().unwrap_or(Decision::Skip))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedProvider;
    use super::*;
    use crate::config::Thresholds;

    fn resolver(names: &[&str]) -> Resolver {
        Resolver::new(
            Matcher::new(Thresholds::default()),
            names.iter().map(|n| n.to_string()).collect(),
        )
    }

    #[test]
    fn exact_match_never_consults_the_provider() {
        let mut provider = ScriptedProvider::new(vec![]);
        let mut resolver = resolver(&["Jane Smith", "John Smith"]);
        let resolution = resolver.resolve("jane smith", &mut provider).unwrap();
        assert_eq!(
            resolution,
            Resolution::Matched {
                index: 0,
                status: MatchStatus::AutoMatched
            }
        );
        assert_eq!(provider.calls, 0);
    }

    #[test]
    fn manual_choice_is_reused_without_reprompting() {
        let mut provider = ScriptedProvider::new(vec![Decision::Select(1)]);
        let mut resolver = resolver(&["Alice Lee", "Alicia Lee"]);

        let first = resolver.resolve("A. Lee", &mut provider).unwrap();
        assert_eq!(
            first,
            Resolution::Matched {
                index: 1,
                status: MatchStatus::ManuallyResolved
            }
        );
        assert_eq!(provider.calls, 1);

        // Same query again, including variant spacing that normalizes equal.
        let second = resolver.resolve("a.  lee", &mut provider).unwrap();
        assert_eq!(second, first);
        assert_eq!(provider.calls, 1);
    }

    #[test]
    fn skip_is_recorded_as_unresolved() {
        let mut provider = ScriptedProvider::new(vec![Decision::Skip]);
        let mut resolver = resolver(&["Jane Smith"]);
        let resolution = resolver.resolve("Zzyzx Quux", &mut provider).unwrap();
        assert_eq!(resolution, Resolution::Unresolved);

        // The skip itself is remembered.
        let again = resolver.resolve("Zzyzx Quux", &mut provider).unwrap();
        assert_eq!(again, Resolution::Unresolved);
        assert_eq!(provider.calls, 1);
    }

    #[test]
    fn new_value_is_carried_through() {
        let mut provider =
            ScriptedProvider::new(vec![Decision::New("Janet Smythe".to_string())]);
        let mut resolver = resolver(&["Jane Smith"]);
        let resolution = resolver.resolve("J. Smythe-ish", &mut provider).unwrap();
        assert_eq!(resolution, Resolution::New("Janet Smythe".to_string()));
    }

    #[test]
    fn keyed_resolver_matches_on_keys_not_display() {
        let matcher = Matcher::new(Thresholds::default());
        let mut resolver = Resolver::with_keys(
            matcher,
            vec![
                ("Jane Smith (jsmith)".to_string(), "jsmith".to_string()),
                ("John Doe (jdoe)".to_string(), "jdoe".to_string()),
            ],
        );
        let mut provider = ScriptedProvider::new(vec![]);
        let resolution = resolver.resolve("jdoe", &mut provider).unwrap();
        assert_eq!(
            resolution,
            Resolution::Matched {
                index: 1,
                status: MatchStatus::AutoMatched
            }
        );
        assert_eq!(provider.calls, 0);
    }
}

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use assert_cmd::Command;
use std::path::Path;
use tempfile::tempdir;

fn write_sheet(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(format!("{}.csv", name)), content).unwrap();
}

fn write_fixture_sheets(dir: &Path) {
    write_sheet(
        dir,
        "papers",
        "paper key,STYLE,ACKNOWLEDGEMENTS,author list\n\
         DEMO,AANDA,ACK-OBS,\"jsmith, jdoe\"\n\
         DEMO-AJ,AJ,0,jsmith\n",
    );
    write_sheet(
        dir,
        "affiliations",
        "SHORTNAME,AFFILIATION\n\
         UdeM,Universite de Montreal\n\
         UNIGE,Observatoire de Geneve\n",
    );
    write_sheet(
        dir,
        "authors",
        "AUTHOR,Last Name,First Name,ORCID,EMAIL,SHORTNAME,AFFILIATIONS,ACKNOWLEDGEMENTS\n\
         Jane Smith,Smith,Jane,0000-0001-2345-6789,jane@example.org,jsmith,\"UdeM, UNIGE\",FRQ\n\
         John Doe,Doe,John,0,0,jdoe,UNIGE,0\n",
    );
    write_sheet(
        dir,
        "acknowledgements",
        "ACKNOWLEDGEMENTS,ACKNOWLEDGEMENTS_TEXT\n\
         ACK-OBS,Based on observations collected at the observatory.\n\
         FRQ,{INITIALS}acknowledges support from FRQ.\n",
    );
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.json");
    fs::write(&path, r#"{"extra_authors_gid": null}"#).unwrap();
    path
}

#[test]
fn generate_writes_the_author_list_document() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    write_fixture_sheets(temp_dir.path());
    let config = write_config(temp_dir.path());
    let output = temp_dir.path().join("demo.tex");

    Command::cargo_bin("coauthor-tex")?
        .args([
            "generate",
            "--paper",
            "DEMO",
            "--output",
            output.to_str().unwrap(),
            "--sheet-dir",
            temp_dir.path().to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success();

    let document = fs::read_to_string(&output)?;
    assert!(document.contains("Jane Smith\\inst{1,2,*}"));
    assert!(document.contains("John Doe\\inst{2}"));
    assert!(document.contains("\\inst{1}Universite de Montreal\\\\"));
    assert!(document.contains("\\inst{*}\\email{jane@example.org}"));
    assert!(document.contains("JS acknowledges support from FRQ."));
    Ok(())
}

#[test]
fn generate_supports_the_aj_style() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    write_fixture_sheets(temp_dir.path());
    let config = write_config(temp_dir.path());
    let output = temp_dir.path().join("demo_aj.tex");

    Command::cargo_bin("coauthor-tex")?
        .args([
            "generate",
            "--paper",
            "DEMO-AJ",
            "--output",
            output.to_str().unwrap(),
            "--sheet-dir",
            temp_dir.path().to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success();

    let document = fs::read_to_string(&output)?;
    assert!(document.contains("\\author[0000-0001-2345-6789]{Jane Smith}"));
    assert!(document.contains("\\affiliation{Universite de Montreal}"));
    assert!(document.contains("\\affiliation{Observatoire de Geneve}"));
    Ok(())
}

#[test]
fn xmatch_reports_matches_and_merged_shortnames() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    write_fixture_sheets(temp_dir.path());
    let config = write_config(temp_dir.path());

    Command::cargo_bin("coauthor-tex")?
        .args([
            "xmatch",
            "--sheet-dir",
            temp_dir.path().to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .write_stdin("Jane Smith, Doe John\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("jsmith"))
        .stdout(predicate::str::contains("jdoe"))
        .stdout(predicate::str::contains("Merged short names: jsmith,jdoe"));
    Ok(())
}

#[test]
fn xmatch_flags_names_below_the_minimum_score() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    write_fixture_sheets(temp_dir.path());
    let config = write_config(temp_dir.path());

    Command::cargo_bin("coauthor-tex")?
        .args([
            "xmatch",
            "--sheet-dir",
            temp_dir.path().to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .write_stdin("Zqx Vwrbl\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("NO MATCH"))
        .stdout(predicate::str::contains("were not matched"));
    Ok(())
}

#[test]
fn missing_sheet_file_is_a_fatal_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    // No sheets written: the papers fetch must fail and abort the run.
    let config = write_config(temp_dir.path());

    Command::cargo_bin("coauthor-tex")?
        .args([
            "generate",
            "--paper",
            "DEMO",
            "--sheet-dir",
            temp_dir.path().to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Sheet file not found"));
    Ok(())
}

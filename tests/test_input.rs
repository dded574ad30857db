use gulp_driver::engine::external::gulp::input::{render_deck, render_header, resolve_labels};
use gulp_driver::engine::external::gulp::{GulpSettings, Setup};
use gulp_driver::error::CalcError;

mod common;

#[test]
fn test_periodic_deck_layout() {
    let structure = common::mgo_structure();
    let settings = GulpSettings {
        keywords: vec!["opti".into(), "conp".into()],
        options: vec!["buckingham\nMg core O shel 1280.1 0.29969 0.0 0.0 10.0".into()],
        ..Default::default()
    };

    let deck = render_deck(&structure, &settings).expect("deck renders");
    let mut lines = deck.lines();

    // Keyword line comes first, exactly as joined
    assert_eq!(lines.next(), Some("opti conp"));

    // Cell block: one row per cell vector
    assert!(deck.contains("vectors\n4.200000000 0.000000000 0.000000000\n"));
    assert!(deck.contains("0.000000000 0.000000000 4.200000000\nfractional\n"));

    // Atoms in input order, fractional, cores
    assert!(deck.contains("Mg   core 0.000000000 0.000000000 0.000000000\n"));
    assert!(deck.contains("O    core 0.500000000 0.500000000 0.500000000\n"));

    // Option lines close the deck
    let options_at = deck.find("buckingham").expect("options present");
    let coords_at = deck.find("fractional").unwrap();
    assert!(options_at > coords_at);
}

#[test]
fn test_cluster_deck_is_cartesian() {
    let structure = common::dimer("Ar", 3.4);
    let settings = GulpSettings::default();

    let deck = render_deck(&structure, &settings).expect("deck renders");
    assert!(deck.contains("cartesian\n"));
    assert!(!deck.contains("vectors"));
    assert!(deck.contains("Ar   core 3.400000000 0.000000000 0.000000000\n"));
}

#[test]
fn test_shell_rows_and_species_block() {
    let structure = common::mgo_structure();
    let mut settings = GulpSettings::default();
    settings.shells.insert("O".to_string(), -2.86);

    let deck = render_deck(&structure, &settings).expect("deck renders");

    // The shelled species gets a shel row right after its core row
    assert!(deck.contains("O    core 0.500000000 0.500000000 0.500000000\nO    shel 0.500000000 0.500000000 0.500000000\n"));
    // Mg carries no shell
    assert!(!deck.contains("Mg   shel"));
    // Charges go into the species block
    assert!(deck.contains("species\nO    shel -2.860000\n"));
}

#[test]
fn test_unmatched_shell_species_still_renders() {
    let structure = common::dimer("Ar", 3.0);
    let mut settings = GulpSettings::default();
    settings.shells.insert("O".to_string(), -2.86);

    // A shell charge for a species the structure never mentions is logged,
    // not fatal, and produces no coordinate row
    let deck = render_deck(&structure, &settings).expect("deck renders");
    assert_eq!(deck.matches("O    shel").count(), 1, "charge line only");
    assert!(deck.contains("species\nO    shel -2.860000\n"));
}

#[test]
fn test_setup_suffixes_labels() {
    let structure = common::mgo_structure();
    let settings = GulpSettings {
        setups: vec![Setup { indices: vec![1], suffix: "1".into() }],
        ..Default::default()
    };

    let labels = resolve_labels(&structure, &settings).expect("labels resolve");
    assert_eq!(labels, vec!["Mg".to_string(), "O1".to_string()]);

    let deck = render_deck(&structure, &settings).expect("deck renders");
    assert!(deck.contains("O1   core"));
    assert!(!deck.contains("O    core"));
}

#[test]
fn test_setup_out_of_range() {
    let structure = common::mgo_structure(); // 2 atoms
    let settings = GulpSettings {
        setups: vec![Setup { indices: vec![2], suffix: "1".into() }],
        ..Default::default()
    };

    match render_deck(&structure, &settings) {
        Err(CalcError::SetupOutOfRange { index: 2, natoms: 2 }) => {}
        other => panic!("expected SetupOutOfRange, got {:?}", other),
    }
}

#[test]
fn test_header_has_no_structure() {
    let settings = GulpSettings {
        keywords: vec!["opti".into(), "conp".into()],
        title: "continuation".into(),
        ..Default::default()
    };

    let header = render_header(&settings);
    assert!(header.starts_with("opti conp\n"));
    assert!(header.contains("title\ncontinuation\nend\n"));
    assert!(!header.contains("fractional"));
    assert!(!header.contains("cartesian"));
}

#[test]
fn test_default_keywords_are_single_point() {
    let settings = GulpSettings::default();
    assert_eq!(settings.keywords, vec!["sing".to_string()]);
    assert!(!settings.requests_relaxation());

    let opti = GulpSettings {
        keywords: vec!["opti".into(), "conp".into()],
        ..Default::default()
    };
    assert!(opti.requests_relaxation());
}

use std::fs;
use std::path::PathBuf;

use regex::Regex;
use text_record_sort::{Sort, SortError};

mod common;

#[test]
fn test_check_sorted() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    common::write_lines(input_path.clone(), &["1. Apple", "415. Apple", "2. Banana is yellow", "32. Cherry is the best"])?;

    let text_record_sort = Sort::new(vec![input_path.clone(), input_path.clone()], PathBuf::new());
    let result = text_record_sort.check()?;
    assert_eq!(result, true);
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_check_not_sorted() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    common::write_lines(input_path.clone(), &["1. Apple", "2. Banana is yellow", "415. Apple"])?;

    let text_record_sort = Sort::new(vec![input_path.clone()], PathBuf::new());
    let result = text_record_sort.check()?;
    assert_eq!(result, false);
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_check_numeric_prefix() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    common::write_lines(input_path.clone(), &["10. Apple", "9. Apple"])?;

    let text_record_sort = Sort::new(vec![input_path.clone()], PathBuf::new());
    assert_eq!(text_record_sort.check()?, false);
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_check_random_then_sorted() -> Result<(), anyhow::Error> {
    common::setup();
    let random_path = common::temp_file_name("./target/results/");
    let sorted_path = common::temp_file_name("./target/results/");
    common::generate_records(random_path.clone(), 1000)?;

    let random_check = Sort::new(vec![random_path.clone()], PathBuf::new());
    assert_eq!(random_check.check()?, false);

    let mut text_record_sort = Sort::new(vec![random_path.clone()], sorted_path.clone());
    text_record_sort.with_chunk_size(100);
    text_record_sort.sort()?;

    let sorted_check = Sort::new(vec![sorted_path.clone()], PathBuf::new());
    assert_eq!(sorted_check.check()?, true);
    fs::remove_file(random_path)?;
    fs::remove_file(sorted_path)?;
    Ok(())
}

#[test]
fn test_check_malformed() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    common::write_lines(input_path.clone(), &["# generated", "1. Apple", "2. Banana"])?;

    let text_record_sort = Sort::new(vec![input_path.clone()], PathBuf::new());
    let error = text_record_sort.check().unwrap_err();
    assert!(matches!(error.downcast_ref::<SortError>(), Some(SortError::MalformedRecord { line_number: 1, .. })));

    let mut ignore_comments = Sort::new(vec![input_path.clone()], PathBuf::new());
    ignore_comments.with_ignore_lines(Regex::new("^#")?);
    assert_eq!(ignore_comments.check()?, true);
    fs::remove_file(input_path)?;
    Ok(())
}

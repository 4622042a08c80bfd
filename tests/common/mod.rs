use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use data_encoding::HEXLOWER;
use rand::distributions::Alphanumeric;
use rand::Rng;

pub fn setup() {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();
    let parallel_results_dir_path = PathBuf::from_str("./target/parallel-results/").unwrap();

    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    }

    if !parallel_results_dir_path.exists() {
        fs::create_dir_all(&parallel_results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create parallel results directory: {:?}", parallel_results_dir_path)
        );
    }
}

#[allow(dead_code)]
pub fn read_lines(path: PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

#[allow(dead_code)]
pub fn write_lines(path: PathBuf, lines: &[&str]) -> Result<(), anyhow::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

/// A fresh, empty directory for the intermediate files of one test
#[allow(dead_code)]
pub fn temp_dir_name(dir: &str) -> PathBuf {
    let result = temp_file_name(dir);
    fs::create_dir_all(&result).unwrap_or_else(|_|
        panic!("Failed to create directory: {:?}", result)
    );
    result
}

/// Write `lines` random records: a number below 100,000 and 10 alphanumeric characters
#[allow(dead_code)]
pub fn generate_records(path: PathBuf, lines: usize) -> Result<(), anyhow::Error> {
    let mut rng = rand::thread_rng();
    let mut writer = BufWriter::new(File::create(path)?);
    for _ in 0..lines {
        let number: u32 = rng.gen_range(0..100_000);
        let payload: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        writeln!(writer, "{}. {}", number, payload)?;
    }
    writer.flush()?;
    Ok(())
}

#[allow(dead_code)]
pub fn is_empty_dir(path: &PathBuf) -> Result<bool, anyhow::Error> {
    Ok(fs::read_dir(path)?.next().is_none())
}

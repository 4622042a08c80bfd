use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Error};
use rand::distributions::Alphanumeric;
use rand::Rng;
use simple_logger::SimpleLogger;
use text_record_sort::sort::Sort;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn generate_records(output_path: &Path, lines: usize) -> Result<(), Error> {
    let mut rng = rand::thread_rng();
    let mut writer = BufWriter::new(
        File::create(output_path)
            .with_context(|| anyhow!("path: {}", output_path.display()))?
    );
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

fn timed_sort(input_path: &Path, output_path: &Path, chunk_size: usize) -> Result<(), Error> {
    let start = Instant::now();
    let mut text_record_sort = Sort::new(vec![input_path.to_path_buf()], output_path.to_path_buf());
    text_record_sort.with_chunk_size(chunk_size);
    text_record_sort.sort()?;
    let bytes = output_path.metadata()?.len();
    log::info!(
        "It took {:.3} seconds to sort {} into a {} bytes file",
        start.elapsed().as_secs_f64(),
        input_path.display(),
        bytes
    );
    Ok(())
}

// cargo run -r --example sort_text_file [lines] [chunk size]
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().with_level(log::LevelFilter::Info).init()?;

    let mut args = std::env::args().skip(1);
    let lines: usize = args.next().map(|a| a.parse::<usize>()).transpose()?.unwrap_or(1_000_000);
    let chunk_size: usize = args.next().map(|a| a.parse::<usize>()).transpose()?.unwrap_or(100_000);

    let input_path = PathBuf::from(format!("./target/random-{lines}.dat"));
    let sorted_path = PathBuf::from(format!("./target/sorted-{lines}.dat"));

    let start = Instant::now();
    generate_records(&input_path, lines)?;
    log::info!("It took {:.3} seconds to generate {} lines", start.elapsed().as_secs_f64(), lines);

    timed_sort(&input_path, &sorted_path, chunk_size)?;
    Ok(())
}

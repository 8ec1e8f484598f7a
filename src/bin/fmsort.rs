use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process;
use std::thread;

use clap::Parser;

use msort_rs::common::{
    self,
    io::{InputBuffer, read_input},
};
use msort_rs::msort::{Progress, SortOptions, StderrTrace, sort_buffer};

/// 4MB buffer for output — reduces flush frequency for large inputs.
const OUTPUT_BUF_SIZE: usize = 4 * 1024 * 1024;

#[derive(Parser)]
#[command(
    name = "fmsort",
    about = "Sort lines of text with forked and threaded merge workers"
)]
struct Cli {
    /// Process-worker budget; defaults to the CPU count
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<usize>,

    /// Thread-worker budget, spent after the job budget; defaults to the CPU count
    #[arg(short = 't', long = "threads", value_name = "N")]
    threads: Option<usize>,

    /// Line delimiter is NUL, not newline
    #[arg(short = 'z', long = "zero-terminated")]
    zero_terminated: bool,

    /// Write result to FILE instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,

    /// Trace sort/merge progress on standard error
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Files to sort
    files: Vec<String>,
}

fn main() {
    common::reset_sigpipe();
    let cli = Cli::parse();

    let separator = if cli.zero_terminated { b'\0' } else { b'\n' };
    let cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);

    let opts = SortOptions {
        separator,
        jobs: cli.jobs.unwrap_or(cpus).max(1),
        threads: cli.threads.unwrap_or(cpus).max(1),
    };

    let inputs = if cli.files.is_empty() {
        vec!["-".to_string()]
    } else {
        cli.files
    };

    let mut input = match read_input(&inputs, separator) {
        Ok(buf) => buf,
        Err(e) => {
            eprintln!("fmsort: {}", common::io_error_msg(&e));
            process::exit(2);
        }
    };

    let trace = StderrTrace;
    let progress: Option<&dyn Progress> = if cli.verbose { Some(&trace) } else { None };

    if let Err(e) = sort_buffer(&mut input.data, &opts, progress) {
        eprintln!("fmsort: {}", e);
        process::exit(2);
    }

    if let Err(e) = write_output(&input, cli.output.as_deref()) {
        eprintln!("fmsort: {}", common::io_error_msg(&e));
        process::exit(2);
    }
}

/// Write the sorted buffer. A separator the reader appended to complete
/// the final record is trimmed back off, so the output mirrors whether
/// the input's last record carried a terminator.
fn write_output(input: &InputBuffer, path: Option<&str>) -> io::Result<()> {
    let data: &[u8] = &input.data;
    let out = if input.padded {
        &data[..data.len() - 1]
    } else {
        data
    };

    match path {
        Some(p) => {
            let mut writer = BufWriter::with_capacity(OUTPUT_BUF_SIZE, File::create(p)?);
            writer.write_all(out)?;
            writer.flush()
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::with_capacity(OUTPUT_BUF_SIZE, stdout.lock());
            writer.write_all(out)?;
            writer.flush()
        }
    }
}

//! CLI utility to report a coder's progress against a dataset and export it.

use std::path::PathBuf;

use surveycoder::config;
use surveycoder::dataset::load_dataset;
use surveycoder::progress::merge::{orphaned_keys, write_merged_file};
use surveycoder::progress::store::write_progress_file;
use surveycoder::progress::{AnnotatorId, ProgressStore};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = surveycoder::logging::init_console() {
        eprintln!("Logging disabled: {err}");
    }

    let coder = AnnotatorId::parse(&options.coder).map_err(|err| err.to_string())?;
    let store = match options.progress_dir {
        Some(dir) => ProgressStore::new(dir),
        None => {
            let settings = config::load_or_default().map_err(|err| err.to_string())?;
            config::progress_store(&settings).map_err(|err| err.to_string())?
        }
    };
    let dataset = load_dataset(&options.dataset).map_err(|err| err.to_string())?;
    let progress = store.load(&coder).map_err(|err| err.to_string())?;

    let counter = progress.counter(&dataset);
    println!(
        "{coder}: {counter} labeled ({} remaining)",
        counter.remaining()
    );
    let orphans = orphaned_keys(&dataset, &progress).len();
    if orphans > 0 {
        println!("{orphans} saved label(s) refer to rows not in this dataset.");
    }

    if let Some(dest) = &options.export {
        write_progress_file(&progress, dest).map_err(|err| err.to_string())?;
        println!("Progress written to {}", dest.display());
    }
    if let Some(dest) = &options.merged {
        write_merged_file(&dataset, &progress, dest).map_err(|err| err.to_string())?;
        println!("Merged dataset written to {}", dest.display());
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Options {
    coder: String,
    dataset: PathBuf,
    progress_dir: Option<PathBuf>,
    export: Option<PathBuf>,
    merged: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut options = Options::default();
    let mut coder = None;
    let mut dataset = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--coder" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--coder requires a value".to_string())?;
                coder = Some(value.to_string());
            }
            "--dataset" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--dataset requires a value".to_string())?;
                dataset = Some(PathBuf::from(value));
            }
            "--progress-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--progress-dir requires a value".to_string())?;
                options.progress_dir = Some(PathBuf::from(value));
            }
            "--export" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--export requires a value".to_string())?;
                options.export = Some(PathBuf::from(value));
            }
            "--merged" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--merged requires a value".to_string())?;
                options.merged = Some(PathBuf::from(value));
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    options.coder = coder.ok_or_else(|| "--coder is required".to_string())?;
    options.dataset = dataset.ok_or_else(|| "--dataset is required".to_string())?;
    Ok(Some(options))
}

fn help_text() -> &'static str {
    "surveycoder-progress --coder <id> --dataset <file> [--progress-dir <dir>] [--export <path>] [--merged <path>]\n\n\
Prints how many rows of <file> the coder has labeled.\n\n\
Options:\n\
  --coder <id>           Coder ID (same as entered in the app)\n\
  --dataset <file>       Master dataset (CSV or spreadsheet)\n\
  --progress-dir <dir>   Directory holding progress files (default: configured or app data dir)\n\
  --export <path>        Write a copy of the coder's progress file\n\
  --merged <path>        Write the dataset with the coder's labels merged in\n\
  -h, --help             Show this help\n\n\
Set SURVEYCODER_LOG (or RUST_LOG) to change log verbosity."
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_required_and_optional_flags() {
        let options = parse_args(args(&[
            "--coder",
            "AB",
            "--dataset",
            "master.csv",
            "--merged",
            "out.csv",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(options.coder, "AB");
        assert_eq!(options.dataset, PathBuf::from("master.csv"));
        assert_eq!(options.merged, Some(PathBuf::from("out.csv")));
        assert_eq!(options.export, None);
    }

    #[test]
    fn rejects_missing_and_unknown_arguments() {
        assert!(parse_args(args(&["--dataset", "x.csv"])).is_err());
        assert!(parse_args(args(&["--coder"])).is_err());
        let err = parse_args(args(&["--bogus"])).unwrap_err();
        assert!(err.contains("Unknown argument: --bogus"));
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse_args(args(&["--help"])).unwrap().is_none());
    }
}

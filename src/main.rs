use log::{error, info, warn};
use std::process::ExitCode;
use unified_volume::{LoaderConfig, UnifiedDataLoader};

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let paths: Vec<_> = std::env::args_os().skip(1).collect();
    if paths.is_empty() {
        error!("Usage: unified-volume <NIFTI_FILE | DICOM_DIR>...");
        return ExitCode::from(2);
    }

    let loader = UnifiedDataLoader::new(LoaderConfig::default());
    let mut failures = 0;
    for path in &paths {
        let display = path.to_string_lossy();
        match loader.load(path) {
            Ok(volume) => {
                info!("{display} ({:?}): {volume}", loader.sniff(path));
                if !volume.warnings().is_empty() {
                    warn!("{display}: {} geometry warnings", volume.warnings().len());
                }
            }
            Err(e) => {
                error!("{display}: {e}");
                failures += 1;
            }
        }
    }

    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

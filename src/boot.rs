use log::{error, info};
use std::fs;
use std::path::Path;
use std::process;

/// Run boot checks before Rocket launches. Creates the database directory
/// if it is missing and aborts if that fails.
pub fn run(db_path: &str) {
    info!("View count service boot check starting...");

    if let Some(dir) = Path::new(db_path).parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            match fs::create_dir_all(dir) {
                Ok(_) => info!("  Created directory: {}", dir.display()),
                Err(e) => {
                    error!("  FAILED to create directory {}: {}", dir.display(), e);
                    error!("Boot check failed. Fix the errors above and restart.");
                    process::exit(1);
                }
            }
        }
    }

    info!("Boot check passed.");
}

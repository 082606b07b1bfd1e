use anyhow::{Context as _, Result};
use driftkit::hcl::ConfigScanner;

use crate::Context;
use crate::cli::ScanArgs;
use crate::paths;
use crate::ui;

pub async fn run(ctx: &Context, args: ScanArgs) -> Result<()> {
    let path = paths::expand(&args.file.to_string_lossy());
    let scanner = ConfigScanner::new(&args.resource_type);
    let declared = scanner.scan_file(&path).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&declared).context("Failed to serialize result")?;
        println!("{json}");
        return Ok(());
    }

    ui::declared(scanner.resource_type(), &declared);
    if declared.is_empty() && !ctx.quiet {
        println!();
        ui::dim(&format!(
            "No resource \"{}\" block found in {}",
            scanner.resource_type(),
            path.display()
        ));
    }
    Ok(())
}

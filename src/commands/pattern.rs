//! # pattern 子命令实现
//!
//! 读取 Bragg 位置文件，用所选峰形展宽为连续图谱并导出 CSV 或 XY。
//! 数值 shift 列会移动对应峰位。
//!
//! ## 依赖关系
//! - 使用 `cli/pattern.rs` 定义的 PatternArgs
//! - 使用 `diffraction/profiles.rs` 和 `diffraction/export.rs`

use crate::cli::common::{parse_range, parse_wavelength};
use crate::cli::pattern::{PatternArgs, PatternFormat};
use crate::diffraction::export;
use crate::diffraction::{broadened_pattern, load_bragg_positions, PatternGrid, Profile};
use crate::error::Result;
use crate::utils::output;

use std::path::Path;

/// 执行 pattern 命令
pub fn execute(args: PatternArgs) -> Result<()> {
    output::print_header("Broadened Diffraction Pattern");

    let mut rows = load_bragg_positions(&args.input)?;
    output::print_success(&format!(
        "Loaded {} Bragg positions from '{}'",
        rows.len(),
        args.input.display()
    ));

    if let Some(phase) = args.phase_id {
        rows.retain(|r| r.phase_id == phase);
        output::print_info(&format!("Phase {}: {} positions", phase, rows.len()));
    }
    if rows.is_empty() {
        output::print_warning("No Bragg positions to broaden");
        return Ok(());
    }

    let (two_theta_min, two_theta_max) = parse_range(&args.range)?;
    let grid = PatternGrid {
        two_theta_min,
        two_theta_max,
        step: args.step,
    };

    let profile = if args.shape.is_empty() {
        Profile::from_fwhm(args.profile, args.fwhm)?
    } else {
        Profile::with_params(args.profile, &args.shape)?
    };
    output::print_info(&format!(
        "Profile {} with parameters {:?}, step {}°, 2θ {:.1}° - {:.1}°",
        profile.kind, profile.params, grid.step, two_theta_min, two_theta_max
    ));

    let data = broadened_pattern(&rows, &profile, &grid)?;

    let format = args
        .format
        .unwrap_or_else(|| guess_format_from_extension(&args.output));
    match format {
        PatternFormat::Csv => export::broadened_to_csv(&data, &args.output)?,
        PatternFormat::Xy => {
            let wavelength = args.wavelength.as_deref().map(parse_wavelength).transpose()?;
            let title = args.title.clone().unwrap_or_else(|| {
                args.input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("pattern")
                    .to_string()
            });
            export::broadened_to_xy(&data, &title, wavelength, &args.output)?
        }
    }

    output::print_success(&format!(
        "{} points written to '{}' ({:?})",
        data.len(),
        args.output.display(),
        format
    ));
    Ok(())
}

/// 从文件扩展名推断输出格式
fn guess_format_from_extension(path: &Path) -> PatternFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("csv") => PatternFormat::Csv,
        _ => PatternFormat::Xy,
    }
}

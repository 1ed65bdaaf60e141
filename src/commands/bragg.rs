//! # bragg 子命令实现
//!
//! 从 CIF 生成对称等价衍射组，计算 |F|² 并写出 Bragg 位置文件。
//!
//! ## 功能
//! - 单文件与批量目录处理（rayon 并行）
//! - X 射线 / 电子散射，可选 κ 模型原子
//! - 可选导出 stick 图谱 CSV
//! - 容差提示以警告输出
//!
//! ## 依赖关系
//! - 使用 `cli/bragg.rs` 定义的 BraggArgs
//! - 使用 `batch/` 进行批量处理
//! - 使用 `diffraction/` 进行计算与导出

use super::{format_hkl, load_kappa_atoms, load_phase};
use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::bragg::BraggArgs;
use crate::cli::common::parse_wavelength;
use crate::config::GenerationConfig;
use crate::diffraction::export;
use crate::diffraction::{
    build_bragg_positions, generate_hkl_array, save_bragg_positions, BraggRow, GroupingEngine,
    StructureModel,
};
use crate::error::{QdiffractError, Result};
use crate::models::Crystal;
use crate::scattering::electron::KappaAtom;
use crate::scattering::ScatteringModel;
use crate::symmetry::ToleranceAdvisory;
use crate::utils::{output, progress};

use std::fs;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 批量模式输出文件名后缀
const BATCH_SUFFIX: &str = "_bragg_positions.txt";

/// 单个晶相的计算结果
pub struct BraggOutcome {
    pub crystal: Crystal,
    pub rows: Vec<BraggRow>,
    pub group_count: usize,
    pub atom_count: usize,
    pub advisories: Vec<ToleranceAdvisory>,
}

/// 由 CIF 计算 Bragg 位置
pub fn compute_bragg_positions(
    input: &Path,
    config: &GenerationConfig,
    scattering: &ScatteringModel,
) -> Result<BraggOutcome> {
    let tolerances = &config.tolerances;
    let (crystal, store) = load_phase(input, tolerances.matrix)?;

    let (structure, advisories) = StructureModel::build(&crystal, &store, tolerances);
    let structure = structure.with_biso_overall(config.biso_overall);
    let rule = store.extinction_rule();

    let candidates = generate_hkl_array(
        config.hkl_max,
        &crystal.cell,
        config.wavelength,
        config.two_theta_max,
        &rule,
        config.mode,
        config.include_origin,
    )?;

    let engine = GroupingEngine {
        cell: crystal.cell,
        operations: store.reciprocal_operations(),
        rule: &rule,
        structure: &structure,
        scattering,
        config,
    };
    let groups = engine.build_groups(&candidates)?;
    let rows = build_bragg_positions(&groups, config.phase_id, config.two_theta_max);

    Ok(BraggOutcome {
        crystal,
        group_count: groups.len(),
        atom_count: structure.atom_count(),
        rows,
        advisories,
    })
}

fn scattering_model(config: &GenerationConfig, kappa_atoms: &[KappaAtom]) -> ScatteringModel {
    kappa_atoms
        .iter()
        .cloned()
        .fold(ScatteringModel::new(config.radiation), ScatteringModel::with_kappa_atom)
}

fn generation_config(args: &BraggArgs) -> Result<GenerationConfig> {
    let config = GenerationConfig {
        wavelength: parse_wavelength(&args.wavelength)?,
        hkl_max: args.hkl_max,
        two_theta_max: args.two_theta_max,
        mode: args.mode,
        individual: args.individual,
        include_origin: args.include_origin,
        radiation: args.radiation,
        phase_id: args.phase_id,
        biso_overall: args.biso_overall,
        tolerances: args.tolerance.to_tolerances()?,
    };
    config.validate()?;
    Ok(config)
}

/// 写出 Bragg 文件及可选的 stick CSV
fn write_outputs(rows: &[BraggRow], output: &Path, with_csv: bool) -> Result<()> {
    save_bragg_positions(rows, output)?;
    if with_csv {
        export::sticks_to_csv(rows, &output.with_extension("csv"))?;
    }
    Ok(())
}

/// 执行 bragg 命令
pub fn execute(args: BraggArgs) -> Result<()> {
    output::print_header("Bragg Positions");

    let config = generation_config(&args)?;
    output::print_info(&format!(
        "λ = {:.5} Å, radiation {:?}, mode {:?}, hkl_max {}",
        config.wavelength, config.radiation, config.mode, config.hkl_max
    ));

    let kappa_atoms = load_kappa_atoms(&args.coppens)?;
    let scattering = scattering_model(&config, &kappa_atoms);

    let collector = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive);

    if collector.is_single_file() {
        execute_single_file(&args, &config, &scattering)
    } else if collector.is_directory() {
        execute_batch(&args, collector, &config, &scattering)
    } else {
        Err(QdiffractError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

/// 单文件模式
fn execute_single_file(
    args: &BraggArgs,
    config: &GenerationConfig,
    scattering: &ScatteringModel,
) -> Result<()> {
    output::print_info(&format!("Single file mode: '{}'", args.input.display()));

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("Phase{}{}", config.phase_id, BATCH_SUFFIX)));
    if output_path.exists() && !args.overwrite {
        output::print_skip(&format!(
            "Output exists, use --overwrite to replace: {}",
            output_path.display()
        ));
        return Ok(());
    }

    let spinner = progress::create_spinner("Building reflection groups");
    let result = compute_bragg_positions(&args.input, config, scattering);
    spinner.finish_and_clear();
    let outcome = result?;

    output::print_success(&format!(
        "Phase '{}': {} atoms in cell, {} reflection groups",
        outcome.crystal.name, outcome.atom_count, outcome.group_count
    ));
    output::print_advisories(&outcome.advisories);

    write_outputs(&outcome.rows, &output_path, args.csv)?;

    print_bragg_table(&outcome.rows, config.wavelength, args.top);
    output::print_written(&args.input.display().to_string(), &output_path.display().to_string());
    Ok(())
}

/// 批量处理模式
fn execute_batch(
    args: &BraggArgs,
    collector: FileCollector,
    config: &GenerationConfig,
    scattering: &ScatteringModel,
) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));

    let files = collector.collect();
    if files.is_empty() {
        output::print_warning(&format!(
            "No matching files found with pattern '{}'",
            args.pattern
        ));
        return Ok(());
    }
    output::print_info(&format!("Found {} structure files", files.len()));

    let output_dir = args.output.clone().unwrap_or_else(|| args.input.clone());
    fs::create_dir_all(&output_dir).map_err(|e| QdiffractError::FileWriteError {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    let runner = BatchRunner::new(args.jobs);
    let result = runner.run(files, |file| {
        process_batch_file(file, &output_dir, config, scattering, args.csv, args.overwrite)
    });

    result.report();
    Ok(())
}

/// 处理批量模式中的单个文件
fn process_batch_file(
    input: &Path,
    output_dir: &Path,
    config: &GenerationConfig,
    scattering: &ScatteringModel,
    with_csv: bool,
    overwrite: bool,
) -> ProcessResult {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("phase");
    let output_file = output_dir.join(format!("{}{}", stem, BATCH_SUFFIX));

    if output_file.exists() && !overwrite {
        return ProcessResult::Skipped(format!(
            "Output exists, skipping: {}",
            output_file.display()
        ));
    }

    let outcome = compute_bragg_positions(input, config, scattering)
        .and_then(|outcome| write_outputs(&outcome.rows, &output_file, with_csv).map(|_| outcome));

    match outcome {
        Ok(outcome) => {
            let note = if outcome.advisories.is_empty() {
                String::new()
            } else {
                format!(" ({} tolerance advisories)", outcome.advisories.len())
            };
            ProcessResult::Success(format!(
                "{} -> {}{}",
                input.display(),
                output_file.display(),
                note
            ))
        }
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}

/// 打印前若干条 Bragg 位置
fn print_bragg_table(rows: &[BraggRow], wavelength: f64, count: usize) {
    #[derive(Tabled)]
    struct BraggTableRow {
        #[tabled(rename = "(hkl)")]
        hkl: String,
        #[tabled(rename = "Mult")]
        multiplicity: usize,
        #[tabled(rename = "2θ (°)")]
        two_theta: String,
        #[tabled(rename = "d (Å)")]
        d_spacing: String,
        #[tabled(rename = "I")]
        intensity: String,
        #[tabled(rename = "I (%)")]
        relative: String,
    }

    let max_intensity = rows.iter().map(|r| r.intensity).fold(0.0_f64, f64::max);

    let table_rows: Vec<BraggTableRow> = rows
        .iter()
        .take(count)
        .map(|r| {
            let sin_theta = (r.two_theta / 2.0).to_radians().sin();
            let d = if sin_theta > 0.0 {
                format!("{:.4}", wavelength / (2.0 * sin_theta))
            } else {
                "inf".to_string()
            };
            let relative = if max_intensity > 0.0 {
                100.0 * r.intensity / max_intensity
            } else {
                0.0
            };
            BraggTableRow {
                hkl: format_hkl(r.hkl),
                multiplicity: r.multiplicity,
                two_theta: format!("{:.3}", r.two_theta),
                d_spacing: d,
                intensity: format!("{:.2}", r.intensity),
                relative: format!("{:.1}", relative),
            }
        })
        .collect();

    if !table_rows.is_empty() {
        output::print_header(&format!("First {} of {} Bragg Positions", table_rows.len(), rows.len()));
        println!("{}", Table::new(&table_rows));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Radiation;
    use crate::diffraction::load_bragg_positions;
    use tempfile::tempdir;

    const NACL_CIF: &str = "data_NaCl
_cell_length_a 5.6402
_cell_length_b 5.6402
_cell_length_c 5.6402
_cell_angle_alpha 90
_cell_angle_beta 90
_cell_angle_gamma 90
_symmetry_Int_Tables_number 225
loop_
_atom_site_label
_atom_site_type_symbol
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Na1 Na 0 0 0
Cl1 Cl 0.5 0.5 0.5
";

    fn config() -> GenerationConfig {
        GenerationConfig {
            hkl_max: 3,
            two_theta_max: Some(60.0),
            ..GenerationConfig::default()
        }
    }

    #[test]
    fn test_compute_nacl() {
        let dir = tempdir().unwrap();
        let cif = dir.path().join("NaCl.cif");
        fs::write(&cif, NACL_CIF).unwrap();

        let config = config();
        let scattering = scattering_model(&config, &[]);
        let outcome = compute_bragg_positions(&cif, &config, &scattering).unwrap();

        assert_eq!(outcome.atom_count, 8);
        assert!(outcome.advisories.is_empty());
        assert_eq!(outcome.rows[0].hkl, [1, -1, -1]);
        assert_eq!(outcome.rows[0].multiplicity, 8);
        assert!(outcome.rows.iter().all(|r| r.two_theta <= 60.0));
        assert!(outcome
            .rows
            .windows(2)
            .all(|w| w[0].two_theta <= w[1].two_theta));
        let find = |hkl: [i32; 3]| outcome.rows.iter().find(|r| r.hkl == hkl).unwrap();
        // 奇数指数时 Na 与 Cl 相消
        assert!(find([0, 0, 2]).intensity > find([1, -1, -1]).intensity);
        assert_eq!(find([0, 2, -2]).multiplicity, 12);
    }

    #[test]
    fn test_electron_origin_kept_with_zero_intensity() {
        let dir = tempdir().unwrap();
        let cif = dir.path().join("NaCl.cif");
        fs::write(&cif, NACL_CIF).unwrap();

        let without = GenerationConfig {
            radiation: Radiation::Electron,
            ..config()
        };
        let with = GenerationConfig {
            include_origin: true,
            ..without.clone()
        };
        let scattering = scattering_model(&with, &[]);
        let plain = compute_bragg_positions(&cif, &without, &scattering).unwrap();
        let outcome = compute_bragg_positions(&cif, &with, &scattering).unwrap();

        assert_eq!(outcome.rows.len(), plain.rows.len() + 1);
        assert_eq!(outcome.rows[0].hkl, [0, 0, 0]);
        assert_eq!(outcome.rows[0].intensity, 0.0);
        assert!(outcome.rows[1..].iter().all(|r| r.intensity >= 0.0));
        assert_eq!(outcome.rows[1].hkl, plain.rows[0].hkl);
        assert!((outcome.rows[1].intensity - plain.rows[0].intensity).abs() < 1e-9);
    }

    #[test]
    fn test_batch_file_skips_existing() {
        let dir = tempdir().unwrap();
        let cif = dir.path().join("NaCl.cif");
        fs::write(&cif, NACL_CIF).unwrap();
        let out_dir = dir.path().join("out");
        fs::create_dir(&out_dir).unwrap();

        let config = config();
        let scattering = scattering_model(&config, &[]);

        let first = process_batch_file(&cif, &out_dir, &config, &scattering, true, false);
        assert!(matches!(first, ProcessResult::Success(_)));
        let written = out_dir.join("NaCl_bragg_positions.txt");
        assert!(out_dir.join("NaCl_bragg_positions.csv").exists());
        let rows = load_bragg_positions(&written).unwrap();
        assert!(!rows.is_empty());

        let second = process_batch_file(&cif, &out_dir, &config, &scattering, false, false);
        assert!(matches!(second, ProcessResult::Skipped(_)));
        let forced = process_batch_file(&cif, &out_dir, &config, &scattering, false, true);
        assert!(matches!(forced, ProcessResult::Success(_)));

        let missing = process_batch_file(&dir.path().join("none.cif"), &out_dir, &config, &scattering, false, true);
        assert!(matches!(missing, ProcessResult::Failed(_, _)));
    }
}

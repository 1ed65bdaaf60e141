//! # Coppens 散射数据读取
//!
//! 读取按原子组织的 Coppens 格式文本：空行分隔的块依次为
//! - `Core subshells:` 核心亚层名称
//! - `Valence subshells:` 价层亚层名称
//! - `Populations:` 全部亚层的布居数（先核心后价层）
//! - 数值曲线：中性原子、核心，随后每个价层一条（`p-` 与 `p` 合并为一条）
//!
//! 曲线在 `sin θ/λ = 0.05·i` 网格上给出。
//!
//! ## 依赖关系
//! - 被 `scattering/electron.rs`（κ 模型）和 `commands/` 使用
//! - 使用 `scattering/curves.rs`

use crate::error::{QdiffractError, Result};
use crate::scattering::curves::{TabulatedCurve, GRID_STEP};

use std::fs;
use std::path::Path;

const CORE_HEADER: &str = "Core subshells";
const VALENCE_HEADER: &str = "Valence subshells";
const POPULATION_HEADER: &str = "Populations";

/// 一个原子的 Coppens 数据
#[derive(Debug, Clone)]
pub struct CoppensAtom {
    /// 元素符号
    pub element: String,
    /// 核心亚层及布居数
    pub core_shells: Vec<(String, f64)>,
    /// 价层亚层及布居数（未合并，如 `2p-`、`2p`）
    pub valence_shells: Vec<(String, f64)>,
    /// 中性原子曲线
    pub neutral: TabulatedCurve,
    /// 核心曲线
    pub core: TabulatedCurve,
    /// 价层曲线（已合并 `p-`/`p`，按出现顺序）
    pub valence: Vec<(String, TabulatedCurve)>,
}

impl CoppensAtom {
    /// 合并后价层的总布居数（`shell` 与 `shell-` 之和）
    pub fn valence_population(&self, shell: &str) -> f64 {
        self.valence_shells
            .iter()
            .filter(|(name, _)| merged_name(name) == shell)
            .map(|(_, p)| p)
            .sum()
    }

    /// 全部布居数之和（中性原子即原子序数）
    pub fn total_population(&self) -> f64 {
        self.core_shells
            .iter()
            .chain(self.valence_shells.iter())
            .map(|(_, p)| p)
            .sum()
    }
}

/// `2p-` -> `2p`
fn merged_name(shell: &str) -> String {
    shell.replace('-', "")
}

/// 从文件读取，元素符号取文件名主干（如 `Si.txt` -> `Si`）
pub fn read_coppens_file(path: &Path) -> Result<CoppensAtom> {
    if !path.exists() {
        return Err(QdiffractError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| QdiffractError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let element = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    parse_coppens(&content, &element, &path.display().to_string())
}

/// 解析 Coppens 文本
pub fn parse_coppens(content: &str, element: &str, path: &str) -> Result<CoppensAtom> {
    let error = |reason: String| QdiffractError::ParseError {
        format: "Coppens".to_string(),
        path: path.to_string(),
        reason,
    };

    let blocks = split_blocks(content);
    let mut core_names: Option<Vec<String>> = None;
    let mut valence_names: Option<Vec<String>> = None;
    let mut populations: Option<Vec<f64>> = None;
    let mut idx = 0;

    while idx < blocks.len() && populations.is_none() {
        let block = &blocks[idx];
        let first = block[0];
        if first.contains(CORE_HEADER) {
            core_names = Some(tokens_after_header(block));
        } else if first.contains(VALENCE_HEADER) {
            valence_names = Some(tokens_after_header(block));
        } else if first.contains(POPULATION_HEADER) {
            let mut tokens = tokens_after_header(block);
            if tokens.is_empty() {
                idx += 1;
                let next = blocks
                    .get(idx)
                    .ok_or_else(|| error("missing population values".to_string()))?;
                tokens = next
                    .iter()
                    .flat_map(|line| line.split_whitespace())
                    .map(str::to_string)
                    .collect();
            }
            populations = Some(parse_numbers(&tokens).map_err(error)?);
        }
        idx += 1;
    }

    let core_names = core_names.ok_or_else(|| error(format!("missing '{}'", CORE_HEADER)))?;
    let valence_names =
        valence_names.ok_or_else(|| error(format!("missing '{}'", VALENCE_HEADER)))?;
    let populations =
        populations.ok_or_else(|| error(format!("missing '{}'", POPULATION_HEADER)))?;

    if populations.len() < core_names.len() + valence_names.len() {
        return Err(error(format!(
            "{} populations for {} subshells",
            populations.len(),
            core_names.len() + valence_names.len()
        )));
    }

    let core_shells: Vec<(String, f64)> = core_names
        .iter()
        .cloned()
        .zip(populations.iter().copied())
        .collect();
    let valence_shells: Vec<(String, f64)> = valence_names
        .iter()
        .cloned()
        .zip(populations[core_names.len()..].iter().copied())
        .collect();

    let mut merged: Vec<String> = Vec::new();
    for name in &valence_names {
        let name = merged_name(name);
        if !merged.contains(&name) {
            merged.push(name);
        }
    }

    let curve_blocks = &blocks[idx..];
    if curve_blocks.len() != merged.len() + 2 {
        return Err(error(format!(
            "expected {} curves (neutral, core and {} valence), found {}",
            merged.len() + 2,
            merged.len(),
            curve_blocks.len()
        )));
    }

    let mut curves = Vec::with_capacity(curve_blocks.len());
    for block in curve_blocks {
        let tokens: Vec<String> = block
            .iter()
            .flat_map(|line| line.split_whitespace())
            .map(str::to_string)
            .collect();
        let values = parse_numbers(&tokens).map_err(error)?;
        curves.push(TabulatedCurve::on_grid(values, GRID_STEP)?);
    }

    let mut curves = curves.into_iter();
    let (neutral, core) = match (curves.next(), curves.next()) {
        (Some(n), Some(c)) => (n, c),
        _ => return Err(error("missing neutral-atom or core curve".to_string())),
    };
    let valence = merged.into_iter().zip(curves).collect();

    Ok(CoppensAtom {
        element: element.to_string(),
        core_shells,
        valence_shells,
        neutral,
        core,
        valence,
    })
}

/// 按空行切分为非空块
fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// 块内去掉标题（冒号及之前的内容）后的所有词
fn tokens_after_header(block: &[&str]) -> Vec<String> {
    let first = block[0];
    let rest = match first.find(':') {
        Some(pos) => &first[pos + 1..],
        None => "",
    };
    rest.split_whitespace()
        .chain(block[1..].iter().flat_map(|line| line.split_whitespace()))
        .map(str::to_string)
        .collect()
}

fn parse_numbers(tokens: &[String]) -> std::result::Result<Vec<f64>, String> {
    tokens
        .iter()
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| format!("invalid number '{}'", t))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_text() -> String {
        let grid = |f: &dyn Fn(f64) -> f64| -> String {
            (0..30)
                .map(|i| format!("{:.6}", f(GRID_STEP * i as f64)))
                .collect::<Vec<_>>()
                .join("  ")
        };
        format!(
            "Core subshells:\n1s 2s 2p- 2p\n\nValence subshells:\n3s 3p- 3p\n\nPopulations:\n\n2 2 2 4 2 1 1\n\n{}\n\n{}\n\n{}\n\n{}\n",
            grid(&|s| 14.0 * (-3.0 * s * s).exp()),
            grid(&|s| 10.0 * (-1.0 * s * s).exp()),
            grid(&|s| (-20.0 * s * s).exp()),
            grid(&|s| (-15.0 * s * s).exp()),
        )
    }

    #[test]
    fn test_parse_sample() {
        let atom = parse_coppens(&sample_text(), "Si", "Si.txt").unwrap();
        assert_eq!(atom.core_shells.len(), 4);
        assert_eq!(atom.valence_shells.len(), 3);
        assert_eq!(atom.valence.len(), 2);
        assert_eq!(atom.valence[0].0, "3s");
        assert_eq!(atom.valence[1].0, "3p");
        assert!((atom.valence_population("3p") - 2.0).abs() < 1e-12);
        assert!((atom.total_population() - 14.0).abs() < 1e-12);
        assert!((atom.core.evaluate(0.0) - 10.0).abs() < 1e-6);
        assert_eq!(atom.neutral.len(), 30);
    }

    #[test]
    fn test_missing_curve_rejected() {
        let text = "Core subshells:\n1s\n\nValence subshells:\n2s\n\nPopulations:\n2 1\n\n1 2 3\n\n1 2 3\n";
        assert!(matches!(
            parse_coppens(text, "Li", "Li.txt"),
            Err(QdiffractError::ParseError { .. })
        ));
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Si.txt");
        std::fs::write(&path, sample_text()).unwrap();
        let atom = read_coppens_file(&path).unwrap();
        assert_eq!(atom.element, "Si");
    }
}

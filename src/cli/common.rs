//! # 共享 CLI 参数
//!
//! 数值容差选项、波长与范围的解析。
//!
//! ## 波长输入
//! - 数值（Å），如 `0.424589`
//! - X 射线特征线名称，如 `cu-ka`、`mo-ka1`
//! - 电子能量，如 `200kev`（相对论 de Broglie 波长）
//!
//! ## 依赖关系
//! - 被 `cli/` 其他子模块和 `commands/` 使用
//! - 使用 `config.rs` 的 Tolerances

use crate::config::Tolerances;
use crate::error::{QdiffractError, Result};

use clap::Args;

/// 数值容差选项
#[derive(Args, Debug, Clone)]
pub struct ToleranceArgs {
    /// Fractional-coordinate distance below which two positions are equivalent
    #[arg(long, default_value_t = 0.005)]
    pub pos_tol: f64,

    /// d-spacing quantisation step for grouping reflections (Å)
    #[arg(long, default_value_t = 1e-5)]
    pub d_tol: f64,

    /// Element-wise tolerance when comparing symmetry operations
    #[arg(long, default_value_t = 1e-8)]
    pub matrix_tol: f64,
}

impl Default for ToleranceArgs {
    fn default() -> Self {
        let defaults = Tolerances::default();
        Self {
            pos_tol: defaults.position,
            d_tol: defaults.d_spacing,
            matrix_tol: defaults.matrix,
        }
    }
}

impl ToleranceArgs {
    /// 转换为容差配置并检查合法性
    pub fn to_tolerances(&self) -> Result<Tolerances> {
        let tolerances = Tolerances {
            position: self.pos_tol,
            d_spacing: self.d_tol,
            matrix: self.matrix_tol,
            ..Tolerances::default()
        };
        tolerances.validate()?;
        Ok(tolerances)
    }
}

/// 预定义 X 射线特征线波长 (Å)
pub fn get_predefined_wavelength(name: &str) -> Option<f64> {
    match name.to_lowercase().as_str() {
        "cu-ka" | "cuka" => Some(1.5418),
        "cu-ka1" | "cuka1" => Some(1.5406),
        "cu-ka2" | "cuka2" => Some(1.5444),
        "cu-kb1" | "cukb1" => Some(1.3922),
        "mo-ka" | "moka" => Some(0.7107),
        "mo-ka1" | "moka1" => Some(0.7093),
        "co-ka" | "coka" => Some(1.7903),
        "fe-ka" | "feka" => Some(1.9373),
        "cr-ka" | "crka" => Some(2.2910),
        "ag-ka" | "agka" => Some(0.5609),
        _ => None,
    }
}

/// 加速电压 (V) 对应的相对论电子波长 (Å)
pub fn electron_wavelength(voltage: f64) -> f64 {
    12.2643 / (voltage * (1.0 + 0.97848e-6 * voltage)).sqrt()
}

/// 解析 `200kev` 形式的电子能量，返回波长
fn parse_electron_energy(input: &str) -> Option<f64> {
    let lower = input.trim().to_lowercase();
    let kev: f64 = lower.strip_suffix("kev")?.trim().parse().ok()?;
    (kev > 0.0).then(|| electron_wavelength(kev * 1000.0))
}

/// 解析波长输入（特征线名称、电子能量或数值）
pub fn parse_wavelength(input: &str) -> Result<f64> {
    if let Some(wl) = get_predefined_wavelength(input) {
        return Ok(wl);
    }
    if let Some(wl) = parse_electron_energy(input) {
        return Ok(wl);
    }
    match input.trim().parse::<f64>() {
        Ok(wl) if wl > 0.0 && wl.is_finite() => Ok(wl),
        _ => Err(QdiffractError::InvalidArgument(format!(
            "Invalid wavelength '{}'. Use a number in Å (e.g., 0.424589), a line name (cu-ka, mo-ka, co-ka, fe-ka, cr-ka, ag-ka) or an electron energy (e.g., 200kev)",
            input
        ))),
    }
}

/// 解析 2θ 范围，如 `"5-90"`
pub fn parse_range(range: &str) -> Result<(f64, f64)> {
    let invalid = || QdiffractError::InvalidRange(range.to_string());
    let (min, max) = range.split_once('-').ok_or_else(invalid)?;
    let min: f64 = min.trim().parse().map_err(|_| invalid())?;
    let max: f64 = max.trim().parse().map_err(|_| invalid())?;

    if min < 0.0 || max <= min || max > 180.0 {
        return Err(QdiffractError::InvalidRange(format!(
            "{} (must be 0 <= min < max <= 180)",
            range
        )));
    }
    Ok((min, max))
}

/// 解析 `h,k,l` 或 `h k l` 形式的 Miller 指数
pub fn parse_hkl(input: &str) -> Result<[i32; 3]> {
    let invalid = || {
        QdiffractError::InvalidArgument(format!(
            "Invalid hkl '{}'. Expected three integers, e.g., 1,1,0",
            input
        ))
    };
    let values: Vec<i32> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().map_err(|_| invalid()))
        .collect::<Result<_>>()?;
    match values.as_slice() {
        [h, k, l] => Ok([*h, *k, *l]),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wavelength() {
        assert_eq!(parse_wavelength("cu-ka").unwrap(), 1.5418);
        assert_eq!(parse_wavelength("MoKa1").unwrap(), 0.7093);
        assert_eq!(parse_wavelength("0.424589").unwrap(), 0.424589);
        assert!(parse_wavelength("-1").is_err());
        assert!(parse_wavelength("xx-ka").is_err());
    }

    #[test]
    fn test_electron_energy() {
        let wl = parse_wavelength("200kev").unwrap();
        assert!((wl - 0.025079).abs() < 1e-5, "{}", wl);
        let wl = parse_wavelength("300keV").unwrap();
        assert!((wl - 0.019687).abs() < 1e-5, "{}", wl);
        assert!(parse_wavelength("0kev").is_err());
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("5-90").unwrap(), (5.0, 90.0));
        assert!(parse_range("90-5").is_err());
        assert!(parse_range("5").is_err());
        assert!(parse_range("0-190").is_err());
    }

    #[test]
    fn test_parse_hkl() {
        assert_eq!(parse_hkl("1,-1,0").unwrap(), [1, -1, 0]);
        assert_eq!(parse_hkl("2 0 0").unwrap(), [2, 0, 0]);
        assert!(parse_hkl("1,1").is_err());
        assert!(parse_hkl("1,a,0").is_err());
    }

    #[test]
    fn test_tolerance_args() {
        let args = ToleranceArgs {
            pos_tol: 0.01,
            d_tol: 1e-4,
            matrix_tol: 1e-6,
        };
        let tol = args.to_tolerances().unwrap();
        assert_eq!(tol.position, 0.01);
        assert_eq!(tol.boundary_band, Tolerances::default().boundary_band);

        let bad = ToleranceArgs { pos_tol: 0.0, ..args };
        assert!(bad.to_tolerances().is_err());
    }
}

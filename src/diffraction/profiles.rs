//! # 峰形函数与展宽图谱
//!
//! 支持的峰形（x 为相对峰位的偏移 2θ − 2θ_hkl）：
//! - Gaussian：`A·exp(−x²/2σ²)/(σ√2π)`
//! - Lorentzian：`A/π·σ/(x²+σ²)`（σ 为半宽）
//! - SplitLorentzian：左右半宽 σ、σr 分别取值
//! - Voigt：Gaussian(σ) 与 Lorentzian(γ) 的卷积，`Re w(z)/(σ√2π)`，w 为 Faddeeva 函数
//! - PseudoVoigt：η 加权的 Gaussian 与 Lorentzian
//! - Moffat：`A·((x/σ)²+1)^(−β)`
//! - Pearson7：`A/(σ·B(m−½,½))·(1+x²/σ²)^(−m)`
//! - BreitWigner：Fano 型不对称峰
//! - DampedOscillator：以绝对 2θ 计算的阻尼振子
//! - DampedHarmonicOscillator：以绝对 2θ 计算，含温度因子 `1−exp(−2θ/γ)`
//!
//! ## 依赖关系
//! - 被 `commands/pattern.rs` 和 `models/parameters.rs` 使用
//! - 使用 `diffraction/bragg.rs` 的 BraggRow

use crate::diffraction::bragg::BraggRow;
use crate::error::{QdiffractError, Result};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// 峰形参数元数据
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeParameter {
    pub name: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

const fn shape(name: &'static str, value: f64, min: f64, max: f64) -> ShapeParameter {
    ShapeParameter {
        name,
        value,
        min,
        max,
    }
}

/// 峰形类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum ProfileKind {
    Gaussian,
    Lorentzian,
    SplitLorentzian,
    Voigt,
    PseudoVoigt,
    Moffat,
    Pearson7,
    BreitWigner,
    DampedOscillator,
    DampedHarmonicOscillator,
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileKind::Gaussian => "Gaussian",
            ProfileKind::Lorentzian => "Lorentzian",
            ProfileKind::SplitLorentzian => "SplitLorentzian",
            ProfileKind::Voigt => "Voigt",
            ProfileKind::PseudoVoigt => "PseudoVoigt",
            ProfileKind::Moffat => "Moffat",
            ProfileKind::Pearson7 => "Pearson7",
            ProfileKind::BreitWigner => "BreitWigner",
            ProfileKind::DampedOscillator => "DampedOscillator",
            ProfileKind::DampedHarmonicOscillator => "DampedHarmonicOscillator",
        };
        write!(f, "{}", name)
    }
}

impl ProfileKind {
    /// 形状参数（不含振幅与峰位）及默认值、边界
    pub fn shape_parameters(&self) -> &'static [ShapeParameter] {
        match self {
            ProfileKind::Gaussian | ProfileKind::Lorentzian | ProfileKind::DampedOscillator => {
                &SIGMA_ONLY
            }
            ProfileKind::SplitLorentzian => &SPLIT_LORENTZIAN,
            ProfileKind::Voigt => &VOIGT,
            ProfileKind::PseudoVoigt => &PSEUDO_VOIGT,
            ProfileKind::Moffat => &MOFFAT,
            ProfileKind::Pearson7 => &PEARSON7,
            ProfileKind::BreitWigner => &BREIT_WIGNER,
            ProfileKind::DampedHarmonicOscillator => &DAMPED_HARMONIC,
        }
    }
}

const INF: f64 = f64::INFINITY;

static SIGMA_ONLY: [ShapeParameter; 1] = [shape("sigma", 0.01, 0.0, INF)];
static SPLIT_LORENTZIAN: [ShapeParameter; 2] =
    [shape("sigma", 0.01, 0.0, INF), shape("sigma_r", 0.01, 0.0, INF)];
static VOIGT: [ShapeParameter; 2] = [shape("sigma", 0.01, 0.0, INF), shape("gamma", 0.01, 0.0, INF)];
static PSEUDO_VOIGT: [ShapeParameter; 2] = [shape("sigma", 0.01, 0.0, INF), shape("eta", 0.5, 0.0, 1.0)];
static MOFFAT: [ShapeParameter; 2] = [shape("sigma", 0.01, 0.0, INF), shape("beta", 1.0, -INF, INF)];
// m ≤ ½ 时 B(m−½,½) 无定义
static PEARSON7: [ShapeParameter; 2] = [shape("sigma", 0.01, 0.0, INF), shape("m", 1.0, 0.51, 100.0)];
static DAMPED_HARMONIC: [ShapeParameter; 2] =
    [shape("sigma", 0.01, 0.0, INF), shape("gamma", 0.001, 1e-19, INF)];
static BREIT_WIGNER: [ShapeParameter; 2] =
    [shape("sigma", 0.03, 0.0, INF), shape("q", 100.0, -INF, INF)];

/// 带参数的峰形
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub kind: ProfileKind,
    /// 按 `shape_parameters` 顺序排列
    pub params: Vec<f64>,
}

impl Profile {
    /// 使用默认形状参数
    pub fn new(kind: ProfileKind) -> Self {
        Self {
            kind,
            params: kind.shape_parameters().iter().map(|p| p.value).collect(),
        }
    }

    /// 指定形状参数，数量与边界需匹配
    pub fn with_params(kind: ProfileKind, params: &[f64]) -> Result<Self> {
        let meta = kind.shape_parameters();
        if params.len() != meta.len() {
            return Err(QdiffractError::InvalidArgument(format!(
                "{} expects {} shape parameter(s), got {}",
                kind,
                meta.len(),
                params.len()
            )));
        }
        for (p, value) in meta.iter().zip(params) {
            if *value < p.min || *value > p.max {
                return Err(QdiffractError::InvalidRange(format!(
                    "{} {} = {} outside [{}, {}]",
                    kind, p.name, value, p.min, p.max
                )));
            }
        }
        Ok(Self {
            kind,
            params: params.to_vec(),
        })
    }

    /// 按 FWHM 给出形状参数（其余取默认值）
    pub fn from_fwhm(kind: ProfileKind, fwhm: f64) -> Result<Self> {
        if !(fwhm > 0.0) {
            return Err(QdiffractError::InvalidRange(format!(
                "FWHM must be positive, got {}",
                fwhm
            )));
        }
        let mut profile = Self::new(kind);
        let sigma = match kind {
            ProfileKind::Gaussian | ProfileKind::Voigt => fwhm / (2.0 * (2.0 * 2.0_f64.ln()).sqrt()),
            _ => fwhm / 2.0,
        };
        profile.params[0] = sigma;
        if kind == ProfileKind::SplitLorentzian {
            profile.params[1] = sigma;
        }
        Ok(profile)
    }

    fn param(&self, idx: usize) -> f64 {
        self.params
            .get(idx)
            .copied()
            .unwrap_or_else(|| self.kind.shape_parameters()[idx].value)
    }

    /// 振幅 `amplitude`、峰位 `center` 的峰在 `x` 处的值
    pub fn evaluate(&self, x: f64, amplitude: f64, center: f64) -> f64 {
        let sigma = self.param(0);
        let dx = x - center;
        match self.kind {
            ProfileKind::Gaussian => {
                amplitude * (-dx * dx / (2.0 * sigma * sigma)).exp() / (sigma * (2.0 * PI).sqrt())
            }
            ProfileKind::Lorentzian => amplitude / PI * (sigma / (dx * dx + sigma * sigma)),
            ProfileKind::SplitLorentzian => {
                let sigma_r = self.param(1);
                let left = sigma * sigma / (dx * dx + sigma * sigma) * heaviside(-dx);
                let right = sigma_r * sigma_r / (dx * dx + sigma_r * sigma_r) * heaviside(dx);
                2.0 * amplitude / (PI * (sigma + sigma_r)) * (left + right)
            }
            ProfileKind::Voigt => {
                let gamma = self.param(1);
                let z = Complex64::new(dx, gamma) / (sigma * 2.0_f64.sqrt());
                amplitude * faddeeva(z).re / (sigma * (2.0 * PI).sqrt())
            }
            ProfileKind::PseudoVoigt => {
                let eta = self.param(1);
                let sigma_g = sigma / (2.0 * 2.0_f64.ln()).sqrt();
                let gauss = (-dx * dx / (2.0 * sigma_g * sigma_g)).exp() / (sigma_g * (2.0 * PI).sqrt());
                let lorentz = sigma / (dx * dx + sigma * sigma) / PI;
                amplitude * ((1.0 - eta) * gauss + eta * lorentz)
            }
            ProfileKind::Moffat => {
                let beta = self.param(1);
                amplitude * ((dx / sigma).powi(2) + 1.0).powf(-beta)
            }
            ProfileKind::Pearson7 => {
                let m = self.param(1);
                let beta = (ln_gamma(m - 0.5) + ln_gamma(0.5) - ln_gamma(m)).exp();
                amplitude / (sigma * beta) * (1.0 + dx * dx / (sigma * sigma)).powf(-m)
            }
            ProfileKind::BreitWigner => {
                let q = self.param(1);
                let half = sigma / 2.0;
                amplitude * (q * half + dx).powi(2) / (half * half + dx * dx)
            }
            ProfileKind::DampedOscillator => {
                if center == 0.0 {
                    return 0.0;
                }
                let ratio = x / center;
                let a1 = (1.0 - ratio * ratio).powi(2);
                let a2 = (2.0 * sigma * ratio).powi(2);
                amplitude / (a1 + a2).sqrt()
            }
            ProfileKind::DampedHarmonicOscillator => {
                if x <= 0.0 {
                    return 0.0;
                }
                let gamma = self.param(1);
                let near = dx * dx + sigma * sigma;
                let far = (x + center).powi(2) + sigma * sigma;
                amplitude * sigma / (PI * (1.0 - (-x / gamma).exp())) * (1.0 / near - 1.0 / far)
            }
        }
    }
}

/// Faddeeva 函数 `w(z) = exp(−z²)·erfc(−iz)`，要求 Im z ≥ 0
///
/// Humlíček (1982) 四区有理逼近，相对误差约 1e-4。
fn faddeeva(z: Complex64) -> Complex64 {
    let (x, y) = (z.re, z.im);
    let t = Complex64::new(y, -x);
    let s = x.abs() + y;

    if s >= 15.0 {
        t * 0.564_189_6 / (t * t + 0.5)
    } else if s >= 5.5 {
        let u = t * t;
        t * (u * 0.564_189_6 + 1.410_474) / (u * (u + 3.0) + 0.75)
    } else if y >= 0.195 * x.abs() - 0.176 {
        horner(t, &[0.564_223_6, 3.778_987, 11.964_82, 20.209_33, 16.495_5])
            / horner(t, &[1.0, 6.699_398, 21.692_74, 39.271_21, 38.823_63, 16.495_5])
    } else {
        let u = t * t;
        let num = horner(u, &[0.564_19, -1.320_522, 35.766_83, -219.031_3, 1_540.787, -3_321.990_5, 36_183.31]);
        let den = horner(
            u,
            &[-1.0, 1.841_439, -61.570_37, 364.219_1, -2_186.181, 9_022.228, -24_322.84, 32_066.6],
        );
        u.exp() - t * num / den
    }
}

/// 多项式求值，系数从最高次到常数项
fn horner(z: Complex64, coeffs: &[f64]) -> Complex64 {
    coeffs
        .iter()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
}

/// ln Γ(x)，Lanczos 逼近（g = 7），x > 0
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_1,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let series = COEF[1..]
        .iter()
        .enumerate()
        .fold(COEF[0], |acc, (i, c)| acc + c / (x + i as f64 + 1.0));
    let t = x + G + 0.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

fn heaviside(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        0.0
    } else {
        0.5
    }
}

/// 展宽图谱的采样网格
#[derive(Debug, Clone, Copy)]
pub struct PatternGrid {
    pub two_theta_min: f64,
    pub two_theta_max: f64,
    pub step: f64,
}

impl PatternGrid {
    pub fn validate(&self) -> Result<()> {
        if !(self.step > 0.0) {
            return Err(QdiffractError::InvalidRange(format!(
                "Step must be positive, got {}",
                self.step
            )));
        }
        if self.two_theta_max <= self.two_theta_min {
            return Err(QdiffractError::InvalidRange(format!(
                "Invalid 2θ range: {} - {}",
                self.two_theta_min, self.two_theta_max
            )));
        }
        Ok(())
    }

    pub fn points(&self) -> Vec<f64> {
        let n_points = ((self.two_theta_max - self.two_theta_min) / self.step).ceil() as usize + 1;
        (0..n_points)
            .map(|i| self.two_theta_min + i as f64 * self.step)
            .collect()
    }
}

/// 由 Bragg 位置生成展宽图谱 `Σ I·profile(2θ − 2θ_hkl)`，最大值归一化为 100
///
/// shift 列为数值时加到峰位上。
pub fn broadened_pattern(rows: &[BraggRow], profile: &Profile, grid: &PatternGrid) -> Result<Vec<(f64, f64)>> {
    grid.validate()?;
    let mut pattern: Vec<(f64, f64)> = grid.points().into_iter().map(|x| (x, 0.0)).collect();

    for row in rows {
        if row.intensity <= 0.0 {
            continue;
        }
        let center = row.two_theta + row.shift.as_number().unwrap_or(0.0);
        for (two_theta, intensity) in pattern.iter_mut() {
            *intensity += profile.evaluate(*two_theta, row.intensity, center);
        }
    }

    let max_intensity = pattern.iter().map(|(_, i)| *i).fold(0.0_f64, f64::max);
    if max_intensity > 0.0 {
        for (_, intensity) in pattern.iter_mut() {
            *intensity = *intensity * 100.0 / max_intensity;
        }
    }

    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffraction::bragg::BraggCell;

    fn row(two_theta: f64, intensity: f64) -> BraggRow {
        BraggRow {
            hkl: [1, 0, 0],
            multiplicity: 1,
            phase_id: 1,
            two_theta,
            shift: BraggCell::Text("shift".to_string()),
            fwhm: BraggCell::Text("FWHM".to_string()),
            intensity,
            extra: [0.0; 3],
        }
    }

    /// 梯形积分
    fn integrate(profile: &Profile, lo: f64, hi: f64, n: usize) -> f64 {
        let h = (hi - lo) / n as f64;
        (0..=n)
            .map(|i| {
                let w = if i == 0 || i == n { 0.5 } else { 1.0 };
                w * profile.evaluate(lo + i as f64 * h, 1.0, 0.0)
            })
            .sum::<f64>()
            * h
    }

    #[test]
    fn test_normalized_shapes_integrate_to_amplitude() {
        let gauss = Profile::with_params(ProfileKind::Gaussian, &[0.1]).unwrap();
        assert!((integrate(&gauss, -2.0, 2.0, 4000) - 1.0).abs() < 1e-6);

        let lorentz = Profile::with_params(ProfileKind::Lorentzian, &[0.1]).unwrap();
        // 尾部收敛慢
        assert!((integrate(&lorentz, -200.0, 200.0, 400000) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_peak_heights() {
        let lorentz = Profile::with_params(ProfileKind::Lorentzian, &[0.5]).unwrap();
        assert!((lorentz.evaluate(10.0, 1.0, 10.0) - 1.0 / (PI * 0.5)).abs() < 1e-12);

        let moffat = Profile::with_params(ProfileKind::Moffat, &[0.2, 1.5]).unwrap();
        assert!((moffat.evaluate(3.0, 2.0, 3.0) - 2.0).abs() < 1e-12);

        let pv = Profile::with_params(ProfileKind::PseudoVoigt, &[0.2, 1.0]).unwrap();
        assert!((pv.evaluate(0.0, 1.0, 0.0) - lorentz_peak(0.2)).abs() < 1e-12);
    }

    fn lorentz_peak(sigma: f64) -> f64 {
        1.0 / (PI * sigma)
    }

    #[test]
    fn test_voigt_limits() {
        // γ = 0 时退化为 Gaussian
        let voigt = Profile::with_params(ProfileKind::Voigt, &[0.1, 0.0]).unwrap();
        let gauss = Profile::with_params(ProfileKind::Gaussian, &[0.1]).unwrap();
        assert!((voigt.evaluate(0.0, 1.0, 0.0) - gauss.evaluate(0.0, 1.0, 0.0)).abs() < 1e-9);
        let x = 0.1 * 2.0_f64.sqrt();
        assert!((voigt.evaluate(x, 1.0, 0.0) - gauss.evaluate(x, 1.0, 0.0)).abs() < 1e-9);

        let broad = Profile::with_params(ProfileKind::Voigt, &[0.1, 0.05]).unwrap();
        assert!(broad.evaluate(0.0, 1.0, 0.0) < voigt.evaluate(0.0, 1.0, 0.0));
        assert!((integrate(&broad, -50.0, 50.0, 200000) - 1.0).abs() < 5e-3);
        assert!(Profile::with_params(ProfileKind::Voigt, &[0.1, -0.01]).is_err());
    }

    #[test]
    fn test_pearson7_reduces_to_lorentzian() {
        let p7 = Profile::with_params(ProfileKind::Pearson7, &[0.2, 1.0]).unwrap();
        let lorentz = Profile::with_params(ProfileKind::Lorentzian, &[0.2]).unwrap();
        for x in [0.0, 0.1, 0.5, 2.0] {
            assert!((p7.evaluate(x, 1.0, 0.0) - lorentz.evaluate(x, 1.0, 0.0)).abs() < 1e-9);
        }
        let sharp = Profile::with_params(ProfileKind::Pearson7, &[0.2, 5.0]).unwrap();
        assert!((integrate(&sharp, -5.0, 5.0, 20000) - 1.0).abs() < 1e-6);
        assert!(Profile::with_params(ProfileKind::Pearson7, &[0.2, 0.5]).is_err());
    }

    #[test]
    fn test_ln_gamma() {
        assert!(ln_gamma(1.0).abs() < 1e-12);
        assert!((ln_gamma(0.5) - PI.sqrt().ln()).abs() < 1e-12);
        assert!((ln_gamma(6.0) - 120.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn test_damped_harmonic_oscillator() {
        let dho = Profile::with_params(ProfileKind::DampedHarmonicOscillator, &[0.1, 0.001]).unwrap();
        assert_eq!(dho.evaluate(0.0, 1.0, 30.0), 0.0);
        let at_center = dho.evaluate(30.0, 1.0, 30.0);
        assert!(at_center > dho.evaluate(29.5, 1.0, 30.0));
        assert!(at_center > dho.evaluate(30.5, 1.0, 30.0));
        // 远离零点时接近半宽 σ 的 Lorentzian
        assert!((at_center - 1.0 / (PI * 0.1)).abs() < 1e-3);
    }

    #[test]
    fn test_split_lorentzian_asymmetry() {
        let split = Profile::with_params(ProfileKind::SplitLorentzian, &[0.1, 0.3]).unwrap();
        let left = split.evaluate(-0.2, 1.0, 0.0);
        let right = split.evaluate(0.2, 1.0, 0.0);
        assert!(right > left);
        // 峰顶处两侧各取一半
        assert!((split.evaluate(0.0, 1.0, 0.0) - 2.0 / (PI * 0.4) * 0.5 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_damped_oscillator_peaks_near_center() {
        let osc = Profile::with_params(ProfileKind::DampedOscillator, &[0.05]).unwrap();
        let at_center = osc.evaluate(30.0, 1.0, 30.0);
        assert!((at_center - 1.0 / 0.1).abs() < 1e-9);
        assert!(osc.evaluate(25.0, 1.0, 30.0) < at_center);
    }

    #[test]
    fn test_parameter_validation() {
        assert!(Profile::with_params(ProfileKind::PseudoVoigt, &[0.1]).is_err());
        assert!(Profile::with_params(ProfileKind::PseudoVoigt, &[0.1, 1.5]).is_err());
        assert!(Profile::with_params(ProfileKind::Gaussian, &[-0.1]).is_err());
        assert!(Profile::from_fwhm(ProfileKind::Gaussian, 0.0).is_err());

        let g = Profile::from_fwhm(ProfileKind::Gaussian, 0.2).unwrap();
        let half = g.evaluate(0.1, 1.0, 0.0) / g.evaluate(0.0, 1.0, 0.0);
        assert!((half - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_broadened_pattern_normalized() {
        let rows = vec![row(20.0, 50.0), row(40.0, 200.0), row(60.0, 0.0)];
        let profile = Profile::from_fwhm(ProfileKind::Gaussian, 0.2).unwrap();
        let grid = PatternGrid {
            two_theta_min: 10.0,
            two_theta_max: 70.0,
            step: 0.01,
        };
        let pattern = broadened_pattern(&rows, &profile, &grid).unwrap();
        assert!(pattern.len() >= 6001);

        let max = pattern.iter().map(|(_, i)| *i).fold(0.0_f64, f64::max);
        assert!((max - 100.0).abs() < 1e-9);
        let at_20 = pattern.iter().find(|(x, _)| (x - 20.0).abs() < 1e-6).unwrap().1;
        assert!((at_20 - 25.0).abs() < 0.1);

        let bad = PatternGrid {
            two_theta_min: 10.0,
            two_theta_max: 5.0,
            step: 0.01,
        };
        assert!(broadened_pattern(&rows, &profile, &bad).is_err());
    }

    #[test]
    fn test_numeric_shift_moves_peak() {
        let mut shifted = row(30.0, 10.0);
        shifted.shift = BraggCell::Number(0.5);
        let profile = Profile::from_fwhm(ProfileKind::Lorentzian, 0.1).unwrap();
        let grid = PatternGrid {
            two_theta_min: 29.0,
            two_theta_max: 31.0,
            step: 0.05,
        };
        let pattern = broadened_pattern(&[shifted], &profile, &grid).unwrap();
        let (peak_x, _) = pattern
            .iter()
            .copied()
            .fold((0.0, f64::MIN), |best, p| if p.1 > best.1 { p } else { best });
        assert!((peak_x - 30.5).abs() < 1e-6);
    }
}

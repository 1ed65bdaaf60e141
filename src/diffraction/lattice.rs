//! # 晶格几何
//!
//! 由晶胞参数计算晶面间距 d(hkl)、晶胞体积以及 Bragg 角。
//!
//! ## 公式
//! - `1/d² = [ (h sinα/a)² + (k sinβ/b)² + (l sinγ/c)²
//!   + 2hk/(ab)(cosα cosβ − cosγ) + 2hl/(ac)(cosγ cosα − cosβ)
//!   + 2kl/(bc)(cosβ cosγ − cosα) ] / ω²`
//! - `V = abc·ω`，其中 `ω² = 1 − cos²α − cos²β − cos²γ + 2 cosα cosβ cosγ`
//!
//! ## 依赖关系
//! - 被 `models/structure.rs` 和 `diffraction/hkl.rs` 使用

use crate::error::{QdiffractError, Result};

/// 检查角度并返回 ω²
fn omega_squared(alpha: f64, beta: f64, gamma: f64) -> Result<f64> {
    for (name, angle) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
        if angle <= 0.0 || angle >= 180.0 || !angle.is_finite() {
            return Err(QdiffractError::DegenerateCell {
                reason: format!("{} = {}° (must lie strictly between 0° and 180°)", name, angle),
            });
        }
    }

    let (ca, cb, cg) = (
        alpha.to_radians().cos(),
        beta.to_radians().cos(),
        gamma.to_radians().cos(),
    );
    let term = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
    if term < 0.0 {
        return Err(QdiffractError::DegenerateCell {
            reason: format!(
                "angles ({}°, {}°, {}°) give a negative volume discriminant {:.3e}",
                alpha, beta, gamma, term
            ),
        });
    }
    Ok(term)
}

fn check_lengths(a: f64, b: f64, c: f64) -> Result<()> {
    if a <= 0.0 || b <= 0.0 || c <= 0.0 {
        return Err(QdiffractError::DegenerateCell {
            reason: format!("cell lengths must be positive, got ({}, {}, {})", a, b, c),
        });
    }
    Ok(())
}

/// 任意（三斜）晶格的晶面间距 d(hkl)，角度单位为度
///
/// `(0,0,0)` 返回 0。
#[allow(clippy::too_many_arguments)]
pub fn d_spacing(
    h: i32,
    k: i32,
    l: i32,
    a: f64,
    b: f64,
    c: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
) -> Result<f64> {
    check_lengths(a, b, c)?;
    let omega2 = omega_squared(alpha, beta, gamma)?;
    if h == 0 && k == 0 && l == 0 {
        return Ok(0.0);
    }
    if omega2 == 0.0 {
        return Err(QdiffractError::DegenerateCell {
            reason: "coplanar cell vectors (zero volume)".to_string(),
        });
    }

    let (ra, rb, rg) = (alpha.to_radians(), beta.to_radians(), gamma.to_radians());
    let (ca, cb, cg) = (ra.cos(), rb.cos(), rg.cos());
    let (sa, sb, sg) = (ra.sin(), rb.sin(), rg.sin());
    let (hf, kf, lf) = (h as f64, k as f64, l as f64);

    let diagonal = (hf * sa / a).powi(2) + (kf * sb / b).powi(2) + (lf * sg / c).powi(2);
    let cross = 2.0 * hf * kf / (a * b) * (ca * cb - cg)
        + 2.0 * hf * lf / (a * c) * (cg * ca - cb)
        + 2.0 * kf * lf / (b * c) * (cb * cg - ca);

    let inv_d2 = (diagonal + cross) / omega2;
    if inv_d2 <= 0.0 {
        return Err(QdiffractError::DegenerateCell {
            reason: format!("non-positive 1/d² = {:.3e} for ({} {} {})", inv_d2, h, k, l),
        });
    }
    Ok(1.0 / inv_d2.sqrt())
}

/// 晶胞体积（Å³），角度单位为度
pub fn cell_volume(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<f64> {
    check_lengths(a, b, c)?;
    let omega2 = omega_squared(alpha, beta, gamma)?;
    Ok(a * b * c * omega2.sqrt())
}

/// Bragg 衍射角 2θ（度）
///
/// 当 `λ/(2d) > 1` 时衍射不可达，返回 `None`（跳过信号，不是错误）。
pub fn two_theta(d: f64, wavelength: f64) -> Option<f64> {
    if d <= 0.0 {
        return None;
    }
    let sin_theta = wavelength / (2.0 * d);
    if sin_theta > 1.0 {
        return None;
    }
    Some(2.0 * sin_theta.asin().to_degrees())
}

/// sin(θ)/λ = 1/(2d)
pub fn sin_theta_over_lambda(d: f64) -> f64 {
    if d > 0.0 {
        0.5 / d
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_d_spacing_cubic_111() {
        let d = d_spacing(1, 1, 1, 5.0, 5.0, 5.0, 90.0, 90.0, 90.0).unwrap();
        assert!((d - 2.8868).abs() < 1e-4);
    }

    #[test]
    fn test_d_spacing_origin_is_zero() {
        let d = d_spacing(0, 0, 0, 5.0, 5.0, 5.0, 90.0, 90.0, 90.0).unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_d_spacing_centrosymmetric() {
        let cell = (4.1, 5.3, 7.7, 83.0, 97.5, 104.0);
        for hkl in [[1, 2, 3], [2, -1, 0], [0, 0, 4], [-3, 1, 2]] {
            let d1 = d_spacing(
                hkl[0], hkl[1], hkl[2], cell.0, cell.1, cell.2, cell.3, cell.4, cell.5,
            )
            .unwrap();
            let d2 = d_spacing(
                -hkl[0], -hkl[1], -hkl[2], cell.0, cell.1, cell.2, cell.3, cell.4, cell.5,
            )
            .unwrap();
            assert!((d1 - d2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_d_spacing_hexagonal() {
        // 六方：1/d² = 4/3 (h² + hk + k²)/a² + l²/c²
        let (a, c) = (3.0, 5.0);
        let d = d_spacing(1, 0, 0, a, a, c, 90.0, 90.0, 120.0).unwrap();
        let expected = 1.0 / (4.0 / 3.0 / (a * a)).sqrt();
        assert!((d - expected).abs() < 1e-10);
    }

    #[test]
    fn test_degenerate_angles_rejected() {
        assert!(matches!(
            d_spacing(1, 0, 0, 5.0, 5.0, 5.0, 0.0, 90.0, 90.0),
            Err(QdiffractError::DegenerateCell { .. })
        ));
        assert!(cell_volume(5.0, 5.0, 5.0, 90.0, 180.0, 90.0).is_err());
        // 负判别式
        assert!(cell_volume(5.0, 5.0, 5.0, 10.0, 10.0, 170.0).is_err());
    }

    #[test]
    fn test_two_theta_unreachable() {
        assert!(two_theta(0.5, 1.5418).is_none());
        let tt = two_theta(2.8868, 1.5418).unwrap();
        assert!(tt > 30.0 && tt < 32.0);
    }
}

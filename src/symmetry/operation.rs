//! # 对称操作
//!
//! 定义仿射对称操作 `r' = R·r + t`（分数坐标），以及 `x,y,z` 形式操作字符串的解析器。
//!
//! ## 解析语法
//! 每个分量由若干带符号项组成，项可以是：
//! - 坐标变量：`x`、`-y`、`2z`、`2*x`
//! - 常数：`1/2`、`0.25`、`-3/4`
//!
//! 项的顺序任意（`1/2-x` 与 `-x+1/2` 等价）。格式错误的字符串返回
//! `QdiffractError::InvalidOperation`。
//!
//! ## 依赖关系
//! - 被 `symmetry/store.rs`、`symmetry/spacegroups.rs` 使用
//! - 被 `symmetry/orbit.rs` 和 `diffraction/hkl.rs` 使用

use crate::error::{QdiffractError, Result};

use std::fmt;

/// 3×3 矩阵
pub type Matrix3 = [[f64; 3]; 3];

/// 单位矩阵
pub const IDENTITY: Matrix3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// 反演矩阵 −I
pub const INVERSION: Matrix3 = [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]];

/// 对称操作 (t, R)，作用为 `r' = R·r + t`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetryOperation {
    /// 平移向量 t（分数坐标）
    pub translation: [f64; 3],
    /// 旋转矩阵 R（行主序）
    pub rotation: Matrix3,
}

impl SymmetryOperation {
    pub fn new(rotation: Matrix3, translation: [f64; 3]) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// 恒等操作
    pub fn identity() -> Self {
        Self::new(IDENTITY, [0.0; 3])
    }

    /// 反演操作（无平移）
    pub fn inversion() -> Self {
        Self::new(INVERSION, [0.0; 3])
    }

    /// 纯平移（用于心化平移）
    pub fn translation(t: [f64; 3]) -> Self {
        Self::new(IDENTITY, t)
    }

    /// 解析 `x,y,z` 形式的操作字符串
    pub fn parse(operation: &str) -> Result<Self> {
        let components: Vec<&str> = operation.split(',').collect();
        if components.len() != 3 {
            return Err(invalid(
                operation,
                format!("expected 3 comma-separated components, found {}", components.len()),
            ));
        }

        let mut rotation = [[0.0; 3]; 3];
        let mut translation = [0.0; 3];
        for (row, component) in components.iter().enumerate() {
            let (coeffs, shift) = parse_component(component, operation)?;
            rotation[row] = coeffs;
            translation[row] = shift;
        }

        Ok(Self::new(rotation, translation))
    }

    /// 作用于分数坐标：`R·r + t`（不取模）
    pub fn apply(&self, r: &[f64; 3]) -> [f64; 3] {
        let m = &self.rotation;
        let t = &self.translation;
        [
            m[0][0] * r[0] + m[0][1] * r[1] + m[0][2] * r[2] + t[0],
            m[1][0] * r[0] + m[1][1] * r[1] + m[1][2] * r[2] + t[1],
            m[2][0] * r[0] + m[2][1] * r[1] + m[2][2] * r[2] + t[2],
        ]
    }

    /// 作用于 Miller 指数：`round(Rᵀ·h)`
    ///
    /// 分数坐标中 R 作用于 r，则倒易矢量按 Rᵀ 变换，使 `h'·r' = h·r` 在平移相位之外保持不变。
    pub fn apply_hkl(&self, hkl: [i32; 3]) -> [i32; 3] {
        let m = &self.rotation;
        let h = [hkl[0] as f64, hkl[1] as f64, hkl[2] as f64];
        let mut out = [0i32; 3];
        for (j, o) in out.iter_mut().enumerate() {
            *o = (m[0][j] * h[0] + m[1][j] * h[1] + m[2][j] * h[2]).round() as i32;
        }
        out
    }

    /// 复合操作 `self ∘ other`（先 other 后 self），平移取模到 [0,1)
    pub fn compose(&self, other: &Self) -> Self {
        let rotation = mat_mul(&self.rotation, &other.rotation);
        let rt = mat_vec(&self.rotation, &other.translation);
        let translation = [
            wrap_unit(rt[0] + self.translation[0]),
            wrap_unit(rt[1] + self.translation[1]),
            wrap_unit(rt[2] + self.translation[2]),
        ];
        Self::new(rotation, translation)
    }

    /// 平移取模到 [0,1) 的副本
    pub fn normalized(&self) -> Self {
        Self::new(
            self.rotation,
            [
                wrap_unit(self.translation[0]),
                wrap_unit(self.translation[1]),
                wrap_unit(self.translation[2]),
            ],
        )
    }

    /// 去掉平移部分（点群操作）
    pub fn without_translation(&self) -> Self {
        Self::new(self.rotation, [0.0; 3])
    }

    /// `R·(−I)`，平移保持不变
    pub fn times_inversion(&self) -> Self {
        Self::new(mat_mul(&self.rotation, &INVERSION), self.translation)
    }

    /// 旋转部分是否严格等于 −I
    pub fn is_inversion(&self) -> bool {
        self.rotation == INVERSION
    }

    /// 矩阵元与平移逐元素比较（容差 tol）
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        let rot_eq = self
            .rotation
            .iter()
            .flatten()
            .zip(other.rotation.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tol);
        rot_eq
            && self
                .translation
                .iter()
                .zip(other.translation.iter())
                .all(|(a, b)| (a - b).abs() <= tol)
    }

    /// 旋转矩阵行列式
    pub fn determinant(&self) -> f64 {
        let m = &self.rotation;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }
}

impl fmt::Display for SymmetryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = (0..3)
            .map(|row| format_component(&self.rotation[row], self.translation[row]))
            .collect();
        write!(f, "{}", rows.join(","))
    }
}

/// 取模到 [0,1)，吸收接近 1 的舍入误差
pub fn wrap_unit(x: f64) -> f64 {
    let w = x.rem_euclid(1.0);
    if (1.0 - w).abs() < 1e-10 {
        0.0
    } else {
        w
    }
}

pub fn mat_mul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

pub fn mat_vec(m: &Matrix3, v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn invalid(operation: &str, reason: impl Into<String>) -> QdiffractError {
    QdiffractError::InvalidOperation {
        operation: operation.to_string(),
        reason: reason.into(),
    }
}

/// 解析单个分量，返回 (x, y, z 系数, 常数项)
fn parse_component(expr: &str, operation: &str) -> Result<([f64; 3], f64)> {
    let chars: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return Err(invalid(operation, "empty component"));
    }

    let mut coeffs = [0.0; 3];
    let mut shift = 0.0;
    let mut i = 0;
    let mut first = true;

    while i < chars.len() {
        let sign = match chars[i] {
            '+' => {
                i += 1;
                1.0
            }
            '-' => {
                i += 1;
                -1.0
            }
            _ if first => 1.0,
            c => {
                return Err(invalid(
                    operation,
                    format!("expected '+' or '-' before '{}' in '{}'", c, expr),
                ))
            }
        };
        first = false;

        let (number, consumed) = parse_number(&chars[i..], operation, expr)?;
        i += consumed;

        if i < chars.len() && chars[i] == '*' {
            if number.is_none() {
                return Err(invalid(operation, format!("dangling '*' in '{}'", expr)));
            }
            i += 1;
        }

        let axis = match chars.get(i) {
            Some('x' | 'X') => Some(0),
            Some('y' | 'Y') => Some(1),
            Some('z' | 'Z') => Some(2),
            _ => None,
        };

        match (number, axis) {
            (coef, Some(axis)) => {
                coeffs[axis] += sign * coef.unwrap_or(1.0);
                i += 1;
            }
            (Some(value), None) => shift += sign * value,
            (None, None) => {
                let found = chars
                    .get(i)
                    .map(|c| format!("unexpected '{}'", c))
                    .unwrap_or_else(|| "missing term after sign".to_string());
                return Err(invalid(operation, format!("{} in '{}'", found, expr)));
            }
        }
    }

    Ok((coeffs, shift))
}

/// 解析整数、小数或分数，返回 (值, 消耗字符数)
fn parse_number(chars: &[char], operation: &str, expr: &str) -> Result<(Option<f64>, usize)> {
    let mut i = 0;
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        i += 1;
    }
    if i == 0 {
        return Ok((None, 0));
    }

    let text: String = chars[..i].iter().collect();
    let numerator: f64 = text
        .parse()
        .map_err(|_| invalid(operation, format!("bad number '{}' in '{}'", text, expr)))?;

    if i < chars.len() && chars[i] == '/' {
        let start = i + 1;
        let mut j = start;
        while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
            j += 1;
        }
        let den_text: String = chars[start..j].iter().collect();
        let denominator: f64 = den_text.parse().map_err(|_| {
            invalid(operation, format!("bad denominator '{}' in '{}'", den_text, expr))
        })?;
        if denominator == 0.0 {
            return Err(invalid(operation, format!("division by zero in '{}'", expr)));
        }
        return Ok((Some(numerator / denominator), j));
    }

    Ok((Some(numerator), i))
}

/// 将一行 (系数, 平移) 格式化为 `-x+y+1/2` 形式
fn format_component(coeffs: &[f64; 3], shift: f64) -> String {
    let mut out = String::new();
    for (axis, &c) in ["x", "y", "z"].iter().zip(coeffs.iter()) {
        if c.abs() < 1e-12 {
            continue;
        }
        let sign = if c < 0.0 { "-" } else if out.is_empty() { "" } else { "+" };
        let magnitude = c.abs();
        if (magnitude - 1.0).abs() < 1e-12 {
            out.push_str(&format!("{}{}", sign, axis));
        } else {
            out.push_str(&format!("{}{}{}", sign, format_fraction(magnitude), axis));
        }
    }

    if shift.abs() > 1e-12 {
        let sign = if shift < 0.0 { "-" } else if out.is_empty() { "" } else { "+" };
        out.push_str(&format!("{}{}", sign, format_fraction(shift.abs())));
    }

    if out.is_empty() {
        out.push('0');
    }
    out
}

fn format_fraction(value: f64) -> String {
    for den in [1, 2, 3, 4, 6, 8, 12] {
        let num = value * den as f64;
        if (num - num.round()).abs() < 1e-8 {
            let num = num.round() as i64;
            return if den == 1 {
                num.to_string()
            } else {
                format!("{}/{}", num, den)
            };
        }
    }
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identity() {
        let op = SymmetryOperation::parse("x,y,z").unwrap();
        assert_eq!(op.rotation, IDENTITY);
        assert_eq!(op.translation, [0.0; 3]);
    }

    #[test]
    fn test_parse_translation_any_order() {
        let a = SymmetryOperation::parse("-x+1/2, 1/2-y ,z").unwrap();
        assert_eq!(a.rotation[0], [-1.0, 0.0, 0.0]);
        assert_eq!(a.rotation[1], [0.0, -1.0, 0.0]);
        assert_eq!(a.translation, [0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_parse_hexagonal_and_decimal() {
        let op = SymmetryOperation::parse("x-y,X,z+0.25").unwrap();
        assert_eq!(op.rotation[0], [1.0, -1.0, 0.0]);
        assert_eq!(op.rotation[1], [1.0, 0.0, 0.0]);
        assert!((op.translation[2] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_parse_coefficients() {
        let op = SymmetryOperation::parse("2y,2*x,-z+2/3").unwrap();
        assert_eq!(op.rotation[0], [0.0, 2.0, 0.0]);
        assert_eq!(op.rotation[1], [2.0, 0.0, 0.0]);
        assert!((op.translation[2] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["x,y", "x,y,z,x", "x,,z", "x,y,q", "x,y,z+", "x,y,1/0", "xy,y,z"] {
            assert!(
                matches!(
                    SymmetryOperation::parse(bad),
                    Err(QdiffractError::InvalidOperation { .. })
                ),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_apply_and_hkl() {
        let op = SymmetryOperation::parse("-y,x-y,z+1/3").unwrap();
        let r = op.apply(&[0.1, 0.2, 0.3]);
        assert!((r[0] + 0.2).abs() < 1e-12);
        assert!((r[1] + 0.1).abs() < 1e-12);
        assert!((r[2] - (0.3 + 1.0 / 3.0)).abs() < 1e-12);

        // h·(R r) = (Rᵀh)·r
        let h = [1, 2, 3];
        let hp = op.apply_hkl(h);
        let r0 = [0.11, 0.27, 0.43];
        let rr = op.without_translation().apply(&r0);
        let hr = h[0] as f64 * rr[0] + h[1] as f64 * rr[1] + h[2] as f64 * rr[2];
        let hpr = hp[0] as f64 * r0[0] + hp[1] as f64 * r0[1] + hp[2] as f64 * r0[2];
        assert!((hr - hpr).abs() < 1e-12);
    }

    #[test]
    fn test_compose_wraps_translation() {
        let a = SymmetryOperation::parse("-x+1/2,-y,z+1/2").unwrap();
        let aa = a.compose(&a);
        assert!(aa.approx_eq(&SymmetryOperation::identity(), 1e-10));
    }

    #[test]
    fn test_times_inversion() {
        let op = SymmetryOperation::identity().times_inversion();
        assert!(op.is_inversion());
        assert!((op.determinant() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_display_roundtrip() {
        for s in ["-x+1/2,y,-z", "x-y,x,z+1/6", "y+3/4,x+1/4,-z+3/4"] {
            let op = SymmetryOperation::parse(s).unwrap();
            assert_eq!(op.to_string(), s);
            let again = SymmetryOperation::parse(&op.to_string()).unwrap();
            assert!(op.approx_eq(&again, 1e-12));
        }
    }

    #[test]
    fn test_wrap_unit() {
        assert_eq!(wrap_unit(1.0), 0.0);
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-12);
        assert_eq!(wrap_unit(0.99999999999999), 0.0);
    }
}

//! # 原子位移参数（ADP）
//!
//! 结构因子中每个原子的位移修正：
//! - 各向同性：`exp(−(Biso + Biso_overall)·s²)`
//! - 各向异性（B）：`exp(−Σ B_ij h_i h_j)`，只累加列出的 6 个独立分量
//! - 非谐（Gram–Charlier 型）：`1 + Σ_族 c_族·Σ X_idx·Π h_idx`
//!
//! 各族的比例常数：B −1，C −1e-3·i，D 1e-4，E 1e-5·i，F −1e-6。
//! 张量分量按下标字符串索引，`"112"` 表示 h·h·k。
//!
//! ## 依赖关系
//! - 被 `models/structure.rs`、`models/parameters.rs` 和 `diffraction/structure_factor.rs` 使用

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

pub const B_INDICES: [&str; 6] = ["11", "22", "33", "12", "13", "23"];

pub const C_INDICES: [&str; 10] = [
    "111", "112", "113", "122", "123", "133", "222", "223", "233", "333",
];

pub const D_INDICES: [&str; 15] = [
    "1111", "1112", "1113", "1122", "1123", "1133", "1222", "1223", "1233", "1333", "2222",
    "2223", "2233", "2333", "3333",
];

pub const E_INDICES: [&str; 21] = [
    "11111", "11112", "11113", "11122", "11123", "11133", "11222", "11223", "11233", "11333",
    "12222", "12223", "12233", "12333", "13333", "22222", "22223", "22233", "22333", "23333",
    "33333",
];

pub const F_INDICES: [&str; 28] = [
    "111111", "111112", "111113", "111122", "111123", "111133", "111222", "111223", "111233",
    "111333", "112222", "112223", "112233", "112333", "113333", "122222", "122223", "122233",
    "122333", "123333", "133333", "222222", "222223", "222233", "222333", "223333", "233333",
    "333333",
];

/// ADP 族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AdpFamily {
    Biso,
    B,
    C,
    D,
    E,
    F,
}

impl AdpFamily {
    /// 张量分量下标列表（Biso 为空）
    pub fn indices(&self) -> &'static [&'static str] {
        match self {
            AdpFamily::Biso => &[],
            AdpFamily::B => &B_INDICES,
            AdpFamily::C => &C_INDICES,
            AdpFamily::D => &D_INDICES,
            AdpFamily::E => &E_INDICES,
            AdpFamily::F => &F_INDICES,
        }
    }

    /// 比例常数
    pub fn scale(&self) -> Complex64 {
        match self {
            AdpFamily::Biso => Complex64::new(1.0, 0.0),
            AdpFamily::B => Complex64::new(-1.0, 0.0),
            AdpFamily::C => Complex64::new(0.0, -1e-3),
            AdpFamily::D => Complex64::new(1e-4, 0.0),
            AdpFamily::E => Complex64::new(0.0, 1e-5),
            AdpFamily::F => Complex64::new(-1e-6, 0.0),
        }
    }

    /// 非谐阶数对应的族：3 → C；4 → C, D；5 → C, D, E；6 → C, D, E, F
    pub fn anharmonic_families(order: u8) -> &'static [AdpFamily] {
        static ALL: [AdpFamily; 4] = [AdpFamily::C, AdpFamily::D, AdpFamily::E, AdpFamily::F];
        match order {
            3 => &ALL[..1],
            4 => &ALL[..2],
            5 => &ALL[..3],
            o if o >= 6 => &ALL,
            _ => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdpFamily::Biso => "Biso",
            AdpFamily::B => "B",
            AdpFamily::C => "C",
            AdpFamily::D => "D",
            AdpFamily::E => "E",
            AdpFamily::F => "F",
        }
    }
}

/// 一个原子的位移参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplacementParameters {
    /// 各向同性温度因子（Å²）
    pub biso: f64,
    /// 各向异性 B_ij（11, 22, 33, 12, 13, 23）
    pub b: [f64; 6],
    /// 三阶 C_ijk
    pub c: [f64; 10],
    /// 四阶 D_ijkl
    pub d: [f64; 15],
    /// 五阶 E
    pub e: [f64; 21],
    /// 六阶 F
    pub f: [f64; 28],
    /// 非谐阶数（0 表示关闭，3..=6）
    pub anharmonic_order: u8,
}

impl Default for DisplacementParameters {
    fn default() -> Self {
        Self {
            biso: 0.0,
            b: [0.0; 6],
            c: [0.0; 10],
            d: [0.0; 15],
            e: [0.0; 21],
            f: [0.0; 28],
            anharmonic_order: 0,
        }
    }
}

impl DisplacementParameters {
    /// 某族的系数
    pub fn coefficients(&self, family: AdpFamily) -> &[f64] {
        match family {
            AdpFamily::Biso => std::slice::from_ref(&self.biso),
            AdpFamily::B => &self.b,
            AdpFamily::C => &self.c,
            AdpFamily::D => &self.d,
            AdpFamily::E => &self.e,
            AdpFamily::F => &self.f,
        }
    }

    pub fn coefficients_mut(&mut self, family: AdpFamily) -> &mut [f64] {
        match family {
            AdpFamily::Biso => std::slice::from_mut(&mut self.biso),
            AdpFamily::B => &mut self.b,
            AdpFamily::C => &mut self.c,
            AdpFamily::D => &mut self.d,
            AdpFamily::E => &mut self.e,
            AdpFamily::F => &mut self.f,
        }
    }

    /// 是否含非零各向异性分量
    pub fn is_anisotropic(&self) -> bool {
        self.b.iter().any(|v| *v != 0.0)
    }

    /// 某族与 hkl 的缩并（已乘比例常数）
    pub fn contraction(&self, family: AdpFamily, hkl: [i32; 3]) -> Complex64 {
        let sum: f64 = family
            .indices()
            .iter()
            .zip(self.coefficients(family))
            .map(|(index, coeff)| coeff * index_product(index, hkl))
            .sum();
        family.scale() * sum
    }

    /// 各向同性 Debye–Waller 因子
    pub fn isotropic_factor(&self, biso_overall: f64, stl: f64) -> f64 {
        (-(self.biso + biso_overall) * stl * stl).exp()
    }

    /// 各向异性因子 `exp(−Σ B_ij h_i h_j)`
    pub fn anisotropic_factor(&self, hkl: [i32; 3]) -> f64 {
        if !self.is_anisotropic() {
            return 1.0;
        }
        self.contraction(AdpFamily::B, hkl).re.exp()
    }

    /// 非谐修正 `1 + Σ c·Σ X·Πh`
    pub fn anharmonic_factor(&self, hkl: [i32; 3]) -> Complex64 {
        AdpFamily::anharmonic_families(self.anharmonic_order)
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, family| {
                acc + self.contraction(*family, hkl)
            })
    }

    /// 完整的位移修正因子
    pub fn factor(&self, hkl: [i32; 3], stl: f64, biso_overall: f64) -> Complex64 {
        self.anharmonic_factor(hkl)
            * (self.isotropic_factor(biso_overall, stl) * self.anisotropic_factor(hkl))
    }
}

/// 下标串对应的 Miller 指数乘积，如 "123" -> h·k·l
fn index_product(index: &str, hkl: [i32; 3]) -> f64 {
    index
        .bytes()
        .map(|b| match b {
            b'1' => hkl[0] as f64,
            b'2' => hkl[1] as f64,
            b'3' => hkl[2] as f64,
            _ => 1.0,
        })
        .product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_lists() {
        assert_eq!(AdpFamily::B.indices().len(), 6);
        assert_eq!(AdpFamily::C.indices().len(), 10);
        assert_eq!(AdpFamily::D.indices().len(), 15);
        assert_eq!(AdpFamily::E.indices().len(), 21);
        assert_eq!(AdpFamily::F.indices().len(), 28);
    }

    #[test]
    fn test_default_is_identity() {
        let adp = DisplacementParameters::default();
        let f = adp.factor([1, 2, 3], 0.3, 0.0);
        assert!((f.re - 1.0).abs() < 1e-12);
        assert!(f.im.abs() < 1e-12);
    }

    #[test]
    fn test_isotropic() {
        let adp = DisplacementParameters {
            biso: 0.5,
            ..DisplacementParameters::default()
        };
        let f = adp.isotropic_factor(0.1, 0.4);
        assert!((f - (-0.6f64 * 0.16).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_anisotropic_counts_listed_components_once() {
        let mut adp = DisplacementParameters::default();
        adp.b = [0.01, 0.0, 0.0, 0.002, 0.0, 0.0];
        // exp(−(B11 h² + B12 h k))
        let expected = (-(0.01 * 4.0 + 0.002 * 2.0 * 1.0f64)).exp();
        assert!((adp.anisotropic_factor([2, 1, 0]) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_anharmonic_orders() {
        let mut adp = DisplacementParameters::default();
        adp.c[0] = 2.0; // C111
        adp.d[0] = 3.0; // D1111
        let hkl = [1, 0, 0];

        adp.anharmonic_order = 0;
        assert_eq!(adp.anharmonic_factor(hkl), Complex64::new(1.0, 0.0));

        adp.anharmonic_order = 3;
        let f3 = adp.anharmonic_factor(hkl);
        assert!((f3.im + 2e-3).abs() < 1e-15);
        assert!((f3.re - 1.0).abs() < 1e-15);

        adp.anharmonic_order = 4;
        let f4 = adp.anharmonic_factor(hkl);
        assert!((f4.re - (1.0 + 3e-4)).abs() < 1e-15);
    }
}

//! # CIF 格式解析器
//!
//! 解析晶体学信息文件（CIF 1.1 子集），取第一个数据块。
//!
//! ## 读取的关键字
//! ```text
//! _cell_length_a / _b / _c, _cell_angle_alpha / _beta / _gamma   （必需）
//! _symmetry_Int_Tables_number 或 _space_group_IT_number
//! _symmetry_space_group_name_H-M 或 _space_group_name_H-M_alt
//! loop_ _symmetry_equiv_pos_as_xyz 或 _space_group_symop_operation_xyz
//! loop_ _atom_site_label _atom_site_type_symbol _atom_site_fract_x/y/z
//!       [_atom_site_occupancy] [_atom_site_B_iso_or_equiv | _atom_site_U_iso_or_equiv]
//! ```
//!
//! 数值可带标准不确定度，如 `5.4630(2)`；`.` 与 `?` 视为缺失。
//! U_iso 按 `B = 8π²U` 换算。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QdiffractError, Result};
use crate::models::{AtomSite, CellParameters, Crystal};

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

const OPERATION_TAGS: [&str; 3] = [
    "_symmetry_equiv_pos_as_xyz",
    "_space_group_symop_operation_xyz",
    "_space_group_symop.operation_xyz",
];

/// 一个 loop_ 表：列名（小写）与按行存储的值
#[derive(Debug, Clone, Default)]
struct CifLoop {
    tags: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CifLoop {
    fn column(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }

    fn has(&self, tag: &str) -> bool {
        self.column(tag).is_some()
    }
}

/// 数据块：单值关键字与 loop_ 表
#[derive(Debug, Clone, Default)]
struct CifBlock {
    name: Option<String>,
    values: HashMap<String, String>,
    loops: Vec<CifLoop>,
}

impl CifBlock {
    fn value(&self, tag: &str) -> Option<&str> {
        self.values
            .get(tag)
            .map(String::as_str)
            .filter(|v| !is_null(v))
    }

    fn find_loop(&self, tag: &str) -> Option<&CifLoop> {
        self.loops.iter().find(|l| l.has(tag))
    }
}

fn is_null(value: &str) -> bool {
    value == "." || value == "?"
}

/// 解析 CIF 文件
pub fn parse_cif_file(path: &Path) -> Result<Crystal> {
    if !path.exists() {
        return Err(QdiffractError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| QdiffractError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_cif_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 CIF
pub fn parse_cif_content(content: &str, default_name: &str) -> Result<Crystal> {
    let tokens = tokenize(content).map_err(|reason| parse_error(default_name, reason))?;
    let block = build_block(&tokens).map_err(|reason| parse_error(default_name, reason))?;

    let cell = CellParameters::new(
        required_number(&block, "_cell_length_a", default_name)?,
        required_number(&block, "_cell_length_b", default_name)?,
        required_number(&block, "_cell_length_c", default_name)?,
        required_number(&block, "_cell_angle_alpha", default_name)?,
        required_number(&block, "_cell_angle_beta", default_name)?,
        required_number(&block, "_cell_angle_gamma", default_name)?,
    );

    let atoms = parse_atom_sites(&block, default_name)?;
    let name = block.name.clone().unwrap_or_else(|| default_name.to_string());
    let mut crystal = Crystal::new(name, cell, atoms);

    let number_tag = ["_symmetry_int_tables_number", "_space_group_it_number"]
        .iter()
        .find_map(|tag| block.value(tag));
    if let Some(raw) = number_tag {
        let number = parse_number(raw)
            .filter(|n| *n >= 1.0 && n.fract() == 0.0)
            .ok_or_else(|| parse_error(default_name, format!("invalid space-group number '{}'", raw)))?;
        crystal.space_group_number = Some(number as u32);
    }

    crystal.space_group_symbol = [
        "_symmetry_space_group_name_h-m",
        "_space_group_name_h-m_alt",
    ]
    .iter()
    .find_map(|tag| block.value(tag))
    .map(|s| s.trim().to_string());

    if let Some((table, column)) = OPERATION_TAGS
        .iter()
        .find_map(|tag| block.find_loop(tag).and_then(|l| l.column(tag).map(|c| (l, c))))
    {
        crystal.symmetry_operations = table
            .rows
            .iter()
            .map(|row| row[column].chars().filter(|c| !c.is_whitespace()).collect())
            .collect();
    }

    Ok(crystal)
}

fn parse_error(path: &str, reason: String) -> QdiffractError {
    QdiffractError::ParseError {
        format: "CIF".to_string(),
        path: path.to_string(),
        reason,
    }
}

/// 数值解析，去除括号中的不确定度
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = match raw.find('(') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    trimmed.trim().parse::<f64>().ok()
}

fn required_number(block: &CifBlock, tag: &str, path: &str) -> Result<f64> {
    let raw = block.value(tag).ok_or_else(|| QdiffractError::MissingKeyword {
        keyword: tag.to_string(),
    })?;
    parse_number(raw).ok_or_else(|| parse_error(path, format!("{} is not numeric: '{}'", tag, raw)))
}

fn parse_atom_sites(block: &CifBlock, path: &str) -> Result<Vec<AtomSite>> {
    let table = block
        .find_loop("_atom_site_fract_x")
        .ok_or_else(|| QdiffractError::MissingKeyword {
            keyword: "_atom_site_fract_x".to_string(),
        })?;

    let column = |tag: &str| -> Result<usize> {
        table.column(tag).ok_or_else(|| QdiffractError::MissingKeyword {
            keyword: tag.to_string(),
        })
    };
    let label_col = column("_atom_site_label")?;
    let coord_cols = [
        column("_atom_site_fract_x")?,
        column("_atom_site_fract_y")?,
        column("_atom_site_fract_z")?,
    ];
    let symbol_col = table.column("_atom_site_type_symbol");
    let occupancy_col = table.column("_atom_site_occupancy");
    let b_col = table.column("_atom_site_b_iso_or_equiv");
    let u_col = table.column("_atom_site_u_iso_or_equiv");

    let optional = |row: &[String], col: Option<usize>| -> Option<f64> {
        col.map(|c| row[c].as_str())
            .filter(|v| !is_null(v))
            .and_then(parse_number)
    };

    let mut atoms = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let label = &row[label_col];
        let mut position = [0.0; 3];
        for (slot, col) in position.iter_mut().zip(coord_cols) {
            *slot = parse_number(&row[col]).ok_or_else(|| {
                parse_error(path, format!("non-numeric coordinate '{}' for {}", row[col], label))
            })?;
        }

        let symbol = symbol_col
            .map(|c| row[c].as_str())
            .filter(|v| !is_null(v))
            .unwrap_or(label.as_str());
        let mut site = AtomSite::new(label.as_str(), symbol, position);

        if let Some(occ) = optional(row.as_slice(), occupancy_col) {
            site = site.with_occupancy(occ);
        }
        if let Some(b) = optional(row.as_slice(), b_col) {
            site = site.with_biso(b);
        } else if let Some(u) = optional(row.as_slice(), u_col) {
            site = site.with_biso(8.0 * PI * PI * u);
        }
        atoms.push(site);
    }

    Ok(atoms)
}

// ─────────────────────────────────────────────────────────────
// 词法与块结构
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// 以 `_` 开头的标签（小写）
    Tag(String),
    Loop,
    Data(String),
    Value(String),
}

fn tokenize(content: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut lines = content.lines().peekable();

    while let Some(line) = lines.next() {
        // 分号文本域
        if let Some(rest) = line.strip_prefix(';') {
            let mut text = rest.to_string();
            let mut closed = false;
            for next in lines.by_ref() {
                if next.starts_with(';') {
                    closed = true;
                    break;
                }
                text.push('\n');
                text.push_str(next);
            }
            if !closed {
                return Err("unterminated semicolon text field".to_string());
            }
            tokens.push(Token::Value(text.trim().to_string()));
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            if c == '#' {
                break;
            }
            if c == '\'' || c == '"' {
                // 引号仅在其后为空白或行尾时闭合
                let mut j = i + 1;
                while j < chars.len() && !(chars[j] == c && chars.get(j + 1).map_or(true, |n| n.is_whitespace())) {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(format!("unterminated quoted string: {}", line.trim()));
                }
                tokens.push(Token::Value(chars[i + 1..j].iter().collect()));
                i = j + 1;
                continue;
            }

            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let lower = word.to_lowercase();
            if lower == "loop_" {
                tokens.push(Token::Loop);
            } else if lower.starts_with("data_") {
                tokens.push(Token::Data(word[5..].to_string()));
            } else if word.starts_with('_') {
                tokens.push(Token::Tag(lower));
            } else {
                tokens.push(Token::Value(word));
            }
        }
    }

    Ok(tokens)
}

/// 由词法单元构建第一个数据块
fn build_block(tokens: &[Token]) -> std::result::Result<CifBlock, String> {
    let mut block = CifBlock::default();
    let mut seen_data = false;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Data(name) => {
                if seen_data {
                    break;
                }
                seen_data = true;
                if !name.is_empty() {
                    block.name = Some(name.clone());
                }
                i += 1;
            }
            Token::Tag(tag) => {
                match tokens.get(i + 1) {
                    Some(Token::Value(v)) => {
                        block.values.insert(tag.clone(), v.clone());
                        i += 2;
                    }
                    _ => return Err(format!("tag {} has no value", tag)),
                }
            }
            Token::Loop => {
                let mut table = CifLoop::default();
                i += 1;
                while let Some(Token::Tag(tag)) = tokens.get(i) {
                    table.tags.push(tag.clone());
                    i += 1;
                }
                if table.tags.is_empty() {
                    return Err("loop_ without tags".to_string());
                }

                let mut values = Vec::new();
                while let Some(Token::Value(v)) = tokens.get(i) {
                    values.push(v.clone());
                    i += 1;
                }
                if values.len() % table.tags.len() != 0 {
                    return Err(format!(
                        "loop with {} tags has {} values",
                        table.tags.len(),
                        values.len()
                    ));
                }
                table.rows = values
                    .chunks(table.tags.len())
                    .map(|chunk| chunk.to_vec())
                    .collect();
                block.loops.push(table);
            }
            Token::Value(v) => {
                return Err(format!("unexpected value '{}'", v));
            }
        }
    }

    Ok(block)
}

// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![doc = "Code generator for the `model_tape` op table.\n\n\
          This is a std-only build tool crate. It reads `model_tape/ops.json`\n\
          and rewrites `model_tape/src/ops_gen.rs`; the generated file is\n\
          committed so downstream builds never run the generator. Run\n\
          `cargo fmt` after regenerating; `--check` compares modulo\n\
          formatting.\n"]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Deserialize, Clone)]
struct Spec {
    version: u32,
    ops: Vec<OpSpec>,
}

#[derive(Deserialize, Clone)]
struct OpSpec {
    name: String,
    mnemonic: String,
    operands: Vec<String>,
}

fn kind_abbrev(kind: &str) -> Result<&'static str> {
    Ok(match kind {
        "reg" => "R",
        "regs" => "RS",
        "int" => "I",
        "ints" => "IS",
        "float" => "F",
        "floats" => "FS",
        "str" => "S",
        "shape" => "SH",
        other => bail!("unknown operand kind '{other}'"),
    })
}

fn kind_rust(kind: &str) -> Result<&'static str> {
    Ok(match kind {
        "reg" => "OperandKind::Reg",
        "regs" => "OperandKind::RegList",
        "int" => "OperandKind::Int",
        "ints" => "OperandKind::IntList",
        "float" => "OperandKind::Float",
        "floats" => "OperandKind::FloatList",
        "str" => "OperandKind::Str",
        "shape" => "OperandKind::Shape",
        other => bail!("unknown operand kind '{other}'"),
    })
}

fn validate(spec: &Spec) -> Result<()> {
    if spec.version != 1 {
        bail!("unsupported schema version {}", spec.version);
    }
    for op in &spec.ops {
        if op.operands.is_empty() {
            bail!("op '{}' declares no operands", op.name);
        }
        for kind in &op.operands {
            kind_abbrev(kind)?;
        }
    }
    for (i, a) in spec.ops.iter().enumerate() {
        for b in spec.ops.iter().skip(i + 1) {
            if a.name == b.name {
                bail!("duplicate op name '{}'", a.name);
            }
            if a.mnemonic == b.mnemonic {
                bail!("duplicate mnemonic '{}'", a.mnemonic);
            }
        }
    }
    Ok(())
}

fn sig_const_name(op: &OpSpec) -> Result<String> {
    let mut parts = Vec::with_capacity(op.operands.len());
    for kind in &op.operands {
        parts.push(kind_abbrev(kind)?);
    }
    Ok(format!("SIG_{}", parts.join("_")))
}

fn render(spec: &Spec) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!(
        "// @generated by model_tape_codegen from ops.json (schema version {}).\n\
         // Do not edit by hand; edit the schema and re-run the generator.\n\n",
        spec.version
    ));

    out.push_str("/// An instruction mnemonic in the tape instruction set.\n");
    out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]\n");
    out.push_str("pub enum TapeOp {\n");
    for op in &spec.ops {
        out.push_str(&format!("    {},\n", op.name));
    }
    out.push_str("}\n\n");

    // One signature constant per distinct operand-kind sequence, in order of
    // first appearance.
    let mut sig_order: Vec<(String, Vec<String>)> = Vec::new();
    for op in &spec.ops {
        let name = sig_const_name(op)?;
        if !sig_order.iter().any(|(n, _)| *n == name) {
            let mut kinds = Vec::with_capacity(op.operands.len());
            for kind in &op.operands {
                kinds.push(kind_rust(kind)?.to_string());
            }
            sig_order.push((name, kinds));
        }
    }
    for (name, kinds) in &sig_order {
        out.push_str(&format!("const {name}: &[OperandKind] = &[\n"));
        for kind in kinds {
            out.push_str(&format!("    {kind},\n"));
        }
        out.push_str("];\n");
    }
    out.push('\n');

    out.push_str("impl TapeOp {\n");
    out.push_str("    /// Every op in schema order.\n");
    out.push_str("    pub const ALL: &'static [TapeOp] = &[\n");
    for op in &spec.ops {
        out.push_str(&format!("        Self::{},\n", op.name));
    }
    out.push_str("    ];\n\n");

    out.push_str("    /// Returns the op's mnemonic string.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub fn mnemonic(self) -> &'static str {\n");
    out.push_str("        match self {\n");
    for op in &spec.ops {
        out.push_str(&format!(
            "            Self::{} => \"{}\",\n",
            op.name, op.mnemonic
        ));
    }
    out.push_str("        }\n    }\n\n");

    out.push_str("    /// Returns the op's fixed operand-kind signature.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub fn signature(self) -> &'static [OperandKind] {\n");
    out.push_str("        match self {\n");
    // Group ops sharing a signature into one arm, ordered by first appearance.
    for (sig_name, _) in &sig_order {
        let mut members: Vec<&str> = Vec::new();
        for op in &spec.ops {
            if sig_const_name(op)? == *sig_name {
                members.push(&op.name);
            }
        }
        let patterns: Vec<String> = members.iter().map(|m| format!("Self::{m}")).collect();
        out.push_str(&format!(
            "            {} => {sig_name},\n",
            patterns.join(" | ")
        ));
    }
    out.push_str("        }\n    }\n}\n");

    Ok(out)
}

fn spec_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../model_tape/ops.json")
}

fn out_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../model_tape/src/ops_gen.rs")
}

fn main() -> Result<()> {
    let check = std::env::args().any(|a| a == "--check");

    let spec_text = fs::read_to_string(spec_path())
        .with_context(|| format!("reading {}", spec_path().display()))?;
    let spec: Spec = serde_json::from_str(&spec_text).context("parsing ops.json")?;
    validate(&spec)?;

    let rendered = render(&spec)?;
    if check {
        let current = fs::read_to_string(out_path())
            .with_context(|| format!("reading {}", out_path().display()))?;
        // Compare modulo formatting: the committed file is rustfmt'ed, which
        // also rewrites trailing commas in flattened arrays.
        let squash = |s: &str| s.split_whitespace().collect::<String>().replace(",]", "]");
        if squash(&current) != squash(&rendered) {
            bail!("ops_gen.rs is stale; re-run model_tape_codegen");
        }
        eprintln!("ops_gen.rs is up to date ({} ops)", spec.ops.len());
        return Ok(());
    }

    fs::write(out_path(), &rendered)
        .with_context(|| format!("writing {}", out_path().display()))?;
    eprintln!("wrote {} ({} ops)", out_path().display(), spec.ops.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{OpSpec, Spec, render, sig_const_name, validate};

    fn op(name: &str, mnemonic: &str, operands: &[&str]) -> OpSpec {
        OpSpec {
            name: name.into(),
            mnemonic: mnemonic.into(),
            operands: operands.iter().map(|s| (*s).into()).collect(),
        }
    }

    #[test]
    fn validate_rejects_duplicates_and_unknown_kinds() {
        let dup = Spec {
            version: 1,
            ops: vec![op("A", "A", &["reg"]), op("A", "B", &["reg"])],
        };
        assert!(validate(&dup).is_err());

        let bad_kind = Spec {
            version: 1,
            ops: vec![op("A", "A", &["tensor"])],
        };
        assert!(validate(&bad_kind).is_err());
    }

    #[test]
    fn sig_names_join_kind_abbreviations() {
        let o = op("Conv", "Conv", &["reg", "reg", "reg", "reg", "ints", "ints"]);
        assert_eq!(sig_const_name(&o).unwrap(), "SIG_R_R_R_R_IS_IS");
    }

    #[test]
    fn render_groups_shared_signatures() {
        let spec = Spec {
            version: 1,
            ops: vec![
                op("Neg", "Neg", &["reg", "reg"]),
                op("Abs", "Abs", &["reg", "reg"]),
                op("Jmp", "Jmp", &["int"]),
            ],
        };
        let text = render(&spec).unwrap();
        assert!(text.contains("Self::Neg | Self::Abs => SIG_R_R,"));
        assert!(text.contains("Self::Jmp => SIG_I,"));
        assert!(text.contains("@generated"));
    }
}

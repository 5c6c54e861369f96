//! Atoms and code blocks.
//!
//! The serialized form of a block is a JSON array whose leaves are tagged
//! objects:
//!
//! ```json
//! [{"kind": "lit", "value": {"type": "int", "value": 5}},
//!  {"kind": "input", "index": 0},
//!  [{"kind": "instr", "name": "int_add"}]]
//! ```

use std::fmt;

use serde::de::value::MapAccessDeserializer;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SerializationError;
use crate::push::instruction::Instruction;
use crate::push::instructions;
use crate::push::value::Value;

/// Smallest executable unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "AtomRepr")]
pub enum Atom {
    /// A value pushed to the stack matching its type.
    Literal(Value),
    /// A catalog instruction.
    Instruction(&'static Instruction),
    /// Reference into the input register.
    Input(usize),
    /// Nested code.
    Block(CodeBlock),
}

impl Atom {
    /// Number of points: 1 for a leaf, block points for a block.
    #[must_use]
    pub fn points(&self) -> usize {
        match self {
            Atom::Block(block) => block.points(),
            _ => 1,
        }
    }

    /// Look up an instruction atom by catalog name.
    #[must_use]
    pub fn instruction(name: &str) -> Option<Atom> {
        instructions::lookup(name).map(Atom::Instruction)
    }

    /// Number of blocks that open after this atom during translation.
    #[must_use]
    pub fn code_blocks(&self) -> u8 {
        match self {
            Atom::Instruction(instr) => instr.code_blocks(),
            _ => 0,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Literal(Value::Str(s)) => write!(f, "{s:?}"),
            Atom::Literal(Value::Char(c)) => write!(f, "{c:?}"),
            Atom::Literal(value) => write!(f, "{value}"),
            Atom::Instruction(instr) => f.write_str(instr.name()),
            Atom::Input(index) => write!(f, "in{index}"),
            Atom::Block(block) => write!(f, "{block}"),
        }
    }
}

/// Ordered sequence of atoms; the program representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeBlock(Vec<Atom>);

impl CodeBlock {
    /// Wrap a sequence of atoms.
    #[must_use]
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self(atoms)
    }

    /// Direct children.
    #[must_use]
    pub fn atoms(&self) -> &[Atom] {
        &self.0
    }

    /// Consume the block, yielding its children.
    #[must_use]
    pub fn into_atoms(self) -> Vec<Atom> {
        self.0
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the block has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a child.
    pub fn push(&mut self, atom: Atom) {
        self.0.push(atom);
    }

    /// Atoms plus block nodes, counting this block.
    #[must_use]
    pub fn points(&self) -> usize {
        1 + self.0.iter().map(Atom::points).sum::<usize>()
    }

    /// Drop trailing code until `points() <= limit`.
    ///
    /// A nested block that straddles the limit is truncated recursively.
    pub fn truncate_points(&mut self, limit: usize) {
        if limit == 0 {
            self.0.clear();
            return;
        }
        let mut budget = limit - 1;
        let mut keep = 0;
        for atom in &mut self.0 {
            if budget == 0 {
                break;
            }
            let points = atom.points();
            if points <= budget {
                budget -= points;
                keep += 1;
            } else {
                if let Atom::Block(inner) = atom {
                    inner.truncate_points(budget);
                    keep += 1;
                }
                break;
            }
        }
        self.0.truncate(keep);
    }
}

impl From<Vec<Atom>> for CodeBlock {
    fn from(atoms: Vec<Atom>) -> Self {
        Self(atoms)
    }
}

impl fmt::Display for CodeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, atom) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{atom}")?;
        }
        f.write_str(")")
    }
}

// ==================== Serialized form ====================

#[derive(Serialize)]
#[serde(untagged)]
enum AtomRepr {
    Block(Vec<Atom>),
    Tagged(TaggedAtom),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum TaggedAtom {
    Lit { value: Value },
    Instr { name: String },
    Input { index: usize },
}

impl TryFrom<TaggedAtom> for Atom {
    type Error = SerializationError;

    fn try_from(tagged: TaggedAtom) -> Result<Self, Self::Error> {
        match tagged {
            TaggedAtom::Lit { value } => Ok(Atom::Literal(value)),
            TaggedAtom::Input { index } => Ok(Atom::Input(index)),
            TaggedAtom::Instr { name } => {
                Atom::instruction(&name).ok_or(SerializationError::UnknownInstruction(name))
            }
        }
    }
}

// Arrays are decoded element by element rather than buffered, so nesting
// depth only costs one visitor frame per level.
impl<'de> Deserialize<'de> for Atom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AtomVisitor)
    }
}

struct AtomVisitor;

impl<'de> Visitor<'de> for AtomVisitor {
    type Value = Atom;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of atoms or a tagged atom object")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Atom, A::Error> {
        let mut atoms = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
        while let Some(atom) = seq.next_element()? {
            atoms.push(atom);
        }
        Ok(Atom::Block(CodeBlock(atoms)))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Atom, A::Error> {
        let tagged = TaggedAtom::deserialize(MapAccessDeserializer::new(map))?;
        Atom::try_from(tagged).map_err(de::Error::custom)
    }
}

impl From<Atom> for AtomRepr {
    fn from(atom: Atom) -> Self {
        match atom {
            Atom::Block(block) => AtomRepr::Block(block.0),
            Atom::Literal(value) => AtomRepr::Tagged(TaggedAtom::Lit { value }),
            Atom::Input(index) => AtomRepr::Tagged(TaggedAtom::Input { index }),
            Atom::Instruction(instr) => AtomRepr::Tagged(TaggedAtom::Instr {
                name: instr.name().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(i: i64) -> Atom {
        Atom::Literal(Value::Int(i))
    }

    fn nested() -> CodeBlock {
        CodeBlock::new(vec![
            lit(1),
            Atom::Block(CodeBlock::new(vec![lit(2), lit(3)])),
            lit(4),
        ])
    }

    #[test]
    fn test_points() {
        assert_eq!(CodeBlock::default().points(), 1);
        // root + 1 + (block + 2) + 4
        assert_eq!(nested().points(), 6);
    }

    #[test]
    fn test_truncate_points() {
        let mut block = nested();
        block.truncate_points(4);
        assert_eq!(block.points(), 4);
        assert_eq!(
            block,
            CodeBlock::new(vec![lit(1), Atom::Block(CodeBlock::new(vec![lit(2)]))])
        );

        let mut block = nested();
        block.truncate_points(100);
        assert_eq!(block, nested());
    }

    #[test]
    fn test_serde_format() {
        let block = CodeBlock::new(vec![
            lit(5),
            Atom::Input(0),
            Atom::Block(CodeBlock::new(vec![Atom::instruction("int_add").unwrap()])),
        ]);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"kind": "lit", "value": {"type": "int", "value": 5}},
                {"kind": "input", "index": 0},
                [{"kind": "instr", "name": "int_add"}]
            ])
        );
        let back: CodeBlock = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_unknown_instruction_rejected() {
        let json = r#"[{"kind": "instr", "name": "int_frobnicate"}]"#;
        assert!(serde_json::from_str::<CodeBlock>(json).is_err());
        let json = r#"[{"kind": "macro", "name": "x"}]"#;
        assert!(serde_json::from_str::<CodeBlock>(json).is_err());
    }

    #[test]
    fn test_display() {
        let block = CodeBlock::new(vec![
            Atom::Literal(Value::Str("hi".into())),
            Atom::Input(1),
            Atom::Block(CodeBlock::new(vec![Atom::instruction("int_add").unwrap()])),
        ]);
        assert_eq!(block.to_string(), "(\"hi\" in1 (int_add))");
    }
}

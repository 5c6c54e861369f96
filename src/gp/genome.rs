//! Linear genomes and their translation to nested code.
//!
//! A genome has no parentheses. Instead, instructions that take code
//! arguments open blocks after themselves, and each gene's `close` count
//! ends pending blocks. Translation is total: any gene sequence yields a
//! balanced [`CodeBlock`].

use serde::{Deserialize, Serialize};

use crate::push::{Atom, CodeBlock};

/// One genome position: an atom plus its epigenetic markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    /// Atom emitted by this gene.
    pub atom: Atom,
    /// Pending blocks to close after the atom.
    #[serde(default)]
    pub close: u8,
    /// Silent genes are skipped by translation.
    #[serde(default)]
    pub silent: bool,
}

impl Gene {
    /// An active gene that closes nothing.
    #[must_use]
    pub fn new(atom: Atom) -> Self {
        Self {
            atom,
            close: 0,
            silent: false,
        }
    }

    /// Same gene with a different close count.
    #[must_use]
    pub fn with_close(mut self, close: u8) -> Self {
        self.close = close;
        self
    }
}

/// A linear sequence of genes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome(Vec<Gene>);

#[derive(Clone, Copy)]
enum Pending {
    /// Ends the current block.
    Close,
    /// Ends the current block and opens a sibling.
    CloseOpen,
}

enum Token {
    Open,
    Close,
    Atom(Atom),
}

impl Genome {
    /// Wrap a gene sequence.
    #[must_use]
    pub fn new(genes: Vec<Gene>) -> Self {
        Self(genes)
    }

    /// Genes in order.
    #[must_use]
    pub fn genes(&self) -> &[Gene] {
        &self.0
    }

    /// Mutable access to the genes.
    pub fn genes_mut(&mut self) -> &mut Vec<Gene> {
        &mut self.0
    }

    /// Consume the genome.
    #[must_use]
    pub fn into_genes(self) -> Vec<Gene> {
        self.0
    }

    /// Number of genes, silent or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no genes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of genes translation would use.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.0.iter().filter(|g| !g.silent).count()
    }

    /// Drop genes past `max_len`.
    pub fn truncate(&mut self, max_len: usize) {
        self.0.truncate(max_len);
    }

    /// Copy with every silent gene removed.
    #[must_use]
    pub fn without_silent(&self) -> Genome {
        Genome(self.0.iter().filter(|g| !g.silent).cloned().collect())
    }

    /// Translate to code.
    ///
    /// Returns the empty block if the result would exceed `max_points`.
    #[must_use]
    pub fn translate(&self, max_points: usize) -> CodeBlock {
        let tokens = self.tokens();
        let points = 1 + tokens
            .iter()
            .map(|t| match t {
                Token::Open => 1,
                Token::Close => 0,
                Token::Atom(atom) => atom.points(),
            })
            .sum::<usize>();
        if points > max_points {
            return CodeBlock::default();
        }
        build_tree(tokens)
    }

    fn tokens(&self) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(self.0.len() * 2);
        let mut pending: Vec<Pending> = Vec::new();

        let close = |pending: &mut Vec<Pending>, tokens: &mut Vec<Token>| match pending.pop() {
            Some(Pending::Close) => {
                tokens.push(Token::Close);
                true
            }
            Some(Pending::CloseOpen) => {
                tokens.push(Token::Close);
                tokens.push(Token::Open);
                true
            }
            None => false,
        };

        for gene in self.0.iter().filter(|g| !g.silent) {
            tokens.push(Token::Atom(gene.atom.clone()));
            let blocks = gene.atom.code_blocks();
            if blocks > 0 {
                tokens.push(Token::Open);
                // the last block to close is the plain one
                pending.push(Pending::Close);
                for _ in 1..blocks {
                    pending.push(Pending::CloseOpen);
                }
            }
            for _ in 0..gene.close {
                if !close(&mut pending, &mut tokens) {
                    break;
                }
            }
        }
        while close(&mut pending, &mut tokens) {}
        tokens
    }
}

fn build_tree(tokens: Vec<Token>) -> CodeBlock {
    let mut open: Vec<Vec<Atom>> = vec![Vec::new()];
    for token in tokens {
        match token {
            Token::Open => open.push(Vec::new()),
            Token::Close => {
                if open.len() > 1
                    && let Some(done) = open.pop()
                    && let Some(parent) = open.last_mut()
                {
                    parent.push(Atom::Block(CodeBlock::new(done)));
                }
            }
            Token::Atom(atom) => {
                if let Some(top) = open.last_mut() {
                    top.push(atom);
                }
            }
        }
    }
    // tokens are balanced, so only the root remains
    let root = open.into_iter().next().unwrap_or_default();
    CodeBlock::new(root)
}

impl From<Vec<Gene>> for Genome {
    fn from(genes: Vec<Gene>) -> Self {
        Self(genes)
    }
}

impl FromIterator<Gene> for Genome {
    fn from_iter<I: IntoIterator<Item = Gene>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::Value;

    fn lit(i: i64) -> Atom {
        Atom::Literal(Value::Int(i))
    }

    fn gene(atom: Atom, close: u8) -> Gene {
        Gene::new(atom).with_close(close)
    }

    fn instr(name: &str) -> Atom {
        Atom::instruction(name).unwrap()
    }

    fn block(atoms: Vec<Atom>) -> Atom {
        Atom::Block(CodeBlock::new(atoms))
    }

    #[test]
    fn test_flat_genome() {
        let genome = Genome::new(vec![gene(lit(1), 0), gene(lit(2), 3)]);
        assert_eq!(genome.translate(100), CodeBlock::new(vec![lit(1), lit(2)]));
    }

    #[test]
    fn test_single_block_closed_by_gene() {
        // exec_dup opens one block; the second literal closes it
        let genome = Genome::new(vec![
            gene(instr("exec_dup"), 0),
            gene(lit(1), 0),
            gene(lit(2), 1),
            gene(lit(3), 0),
        ]);
        assert_eq!(
            genome.translate(100),
            CodeBlock::new(vec![instr("exec_dup"), block(vec![lit(1), lit(2)]), lit(3)])
        );
    }

    #[test]
    fn test_two_blocks_are_siblings() {
        let genome = Genome::new(vec![
            gene(instr("exec_if"), 0),
            gene(lit(1), 1),
            gene(lit(2), 1),
            gene(lit(3), 0),
        ]);
        assert_eq!(
            genome.translate(100),
            CodeBlock::new(vec![
                instr("exec_if"),
                block(vec![lit(1)]),
                block(vec![lit(2)]),
                lit(3),
            ])
        );
    }

    #[test]
    fn test_unclosed_blocks_closed_at_end() {
        let genome = Genome::new(vec![gene(instr("exec_if"), 0), gene(lit(1), 0)]);
        assert_eq!(
            genome.translate(100),
            CodeBlock::new(vec![instr("exec_if"), block(vec![lit(1)]), block(vec![])])
        );
    }

    #[test]
    fn test_silent_genes_skipped() {
        let mut silenced = gene(instr("exec_dup"), 0);
        silenced.silent = true;
        let genome = Genome::new(vec![silenced, gene(lit(1), 0)]);
        assert_eq!(genome.translate(100), CodeBlock::new(vec![lit(1)]));
        assert_eq!(genome.active_len(), 1);
        assert_eq!(genome.without_silent().len(), 1);
    }

    #[test]
    fn test_point_limit_gives_empty_block() {
        let genome: Genome = (0..10).map(|i| gene(lit(i), 0)).collect();
        assert_eq!(genome.translate(11).points(), 11);
        assert_eq!(genome.translate(10), CodeBlock::default());
    }

    #[test]
    fn test_serde_gene_record() {
        let genome = Genome::new(vec![gene(Atom::Input(0), 2)]);
        let json = serde_json::to_value(&genome).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"atom": {"kind": "input", "index": 0}, "close": 2, "silent": false}])
        );
        let back: Genome = serde_json::from_value(json).unwrap();
        assert_eq!(back, genome);
    }
}

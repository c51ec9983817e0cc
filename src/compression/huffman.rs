//! Canonical Huffman codes and the binary trie used to decode them.
//!
//! A code is assigned from nothing but a list of code lengths (RFC 1951
//! §3.2.2): shorter codes numerically precede longer ones, and codes of
//! equal length are consecutive in symbol order. A length of zero means the
//! symbol has no code.
//!
//! The trie is an arena of nodes addressed by index. Codes are inserted most
//! significant bit first, which is also the order DEFLATE transmits them, so
//! decoding reads one bit at a time and walks from the root until it lands
//! on a leaf.

use crate::compression::bits::BitReader;
use crate::{Error, Result};

/// Longest code DEFLATE allows.
pub const MAX_CODE_LENGTH: u8 = 15;

/// One code assignment produced by [`canonical_codes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codeword {
    /// Index of the symbol in the length array.
    pub symbol: usize,
    /// Code value; the `len` low bits are significant.
    pub code: u32,
    /// Code length in bits.
    pub len: u8,
}

impl Codeword {
    /// The code as a string of `0`/`1`, most significant bit first.
    pub fn bit_string(&self) -> String {
        (0..self.len)
            .rev()
            .map(|i| if (self.code >> i) & 1 == 1 { '1' } else { '0' })
            .collect()
    }
}

/// Assign canonical codes to every symbol with a non-zero length.
///
/// The result is in symbol order. Fails if a length exceeds 15 or the
/// lengths over-subscribe the code space (no prefix-free assignment exists).
pub fn canonical_codes(lengths: &[u8]) -> Result<Vec<Codeword>> {
    let mut count = [0u32; MAX_CODE_LENGTH as usize + 1];
    for &len in lengths {
        if len > MAX_CODE_LENGTH {
            return Err(Error::Parse("Huffman code length exceeds 15 bits"));
        }
        count[len as usize] += 1;
    }
    count[0] = 0;

    let mut next = [0u32; MAX_CODE_LENGTH as usize + 1];
    let mut code = 0u32;
    for bits in 1..=MAX_CODE_LENGTH as usize {
        code = (code + count[bits - 1]) << 1;
        next[bits] = code;
    }

    let mut codes = Vec::with_capacity(lengths.len());
    for (symbol, &len) in lengths.iter().enumerate() {
        if len == 0 {
            continue;
        }
        let code = next[len as usize];
        if code >= 1 << len {
            return Err(Error::Parse("over-subscribed Huffman code lengths"));
        }
        next[len as usize] += 1;
        codes.push(Codeword { symbol, code, len });
    }
    Ok(codes)
}

#[derive(Debug, Clone)]
enum Node<T> {
    Branch([Option<u32>; 2]),
    Leaf(T),
}

/// Prefix-free decoding trie with leaves of type `T`.
#[derive(Debug, Clone)]
pub struct HuffmanTree<T> {
    nodes: Vec<Node<T>>,
    leaves: usize,
}

impl<T: Copy> Default for HuffmanTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> HuffmanTree<T> {
    /// An empty trie (a lone root with no children).
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Branch([None, None])],
            leaves: 0,
        }
    }

    /// Build a trie from a code-length array.
    ///
    /// `value` maps a symbol index to its leaf; symbols mapped to `None`
    /// keep their slot in the code space but decode as invalid.
    pub fn from_lengths(
        lengths: &[u8],
        mut value: impl FnMut(usize) -> Option<T>,
    ) -> Result<Self> {
        let mut tree = Self::new();
        for cw in canonical_codes(lengths)? {
            if let Some(v) = value(cw.symbol) {
                tree.insert(cw.code, cw.len, v)?;
            }
        }
        Ok(tree)
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves
    }

    /// Whether the trie has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    /// Insert `value` under the `len` low bits of `code`, MSB first.
    ///
    /// Fails if the new code and an existing one are prefixes of each other.
    pub fn insert(&mut self, code: u32, len: u8, value: T) -> Result<()> {
        if len == 0 || len > MAX_CODE_LENGTH {
            return Err(Error::Parse("Huffman code length out of range"));
        }

        let mut node = 0usize;
        for depth in (1..len).rev() {
            let bit = ((code >> depth) & 1) as usize;
            let child = match &self.nodes[node] {
                Node::Branch(children) => children[bit],
                Node::Leaf(_) => return Err(Error::Parse("Huffman code is not prefix-free")),
            };
            node = match child {
                Some(id) => id as usize,
                None => self.attach(node, bit, Node::Branch([None, None])),
            };
        }

        let bit = (code & 1) as usize;
        match &self.nodes[node] {
            Node::Branch(children) if children[bit].is_none() => {}
            _ => return Err(Error::Parse("Huffman code is not prefix-free")),
        }
        self.attach(node, bit, Node::Leaf(value));
        self.leaves += 1;
        Ok(())
    }

    /// Look up a code given as a bit string of `0`/`1` characters.
    ///
    /// Returns `None` if the string ends on an inner node, walks off the
    /// trie, or contains other characters.
    pub fn lookup(&self, code: &str) -> Option<T> {
        let mut node = 0usize;
        for c in code.chars() {
            let bit = match c {
                '0' => 0,
                '1' => 1,
                _ => return None,
            };
            let Node::Branch(children) = &self.nodes[node] else {
                return None;
            };
            node = children[bit]? as usize;
        }
        match &self.nodes[node] {
            Node::Leaf(v) => Some(*v),
            Node::Branch(_) => None,
        }
    }

    /// Decode one symbol, consuming one bit per trie level.
    pub fn decode(&self, bits: &mut BitReader<'_>) -> Result<T> {
        let mut node = 0usize;
        loop {
            let Node::Branch(children) = &self.nodes[node] else {
                return Err(Error::Parse("invalid Huffman code"));
            };
            let bit = bits.read_bit()? as usize;
            node = children[bit].ok_or(Error::Parse("invalid Huffman code"))? as usize;
            if let Node::Leaf(value) = &self.nodes[node] {
                return Ok(*value);
            }
        }
    }

    fn attach(&mut self, parent: usize, bit: usize, node: Node<T>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(node);
        if let Node::Branch(children) = &mut self.nodes[parent] {
            children[bit] = Some(id as u32);
        }
        id
    }
}

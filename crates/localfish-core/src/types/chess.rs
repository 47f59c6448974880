use std::fmt;

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChessPosition {
    pub fen: String,
}

impl ChessPosition {
    pub fn new(fen: impl Into<String>) -> Self {
        Self { fen: fen.into() }
    }

    pub fn starting() -> Self {
        Self::new("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
    }

    /// Parses a FEN the way the engine will see it.
    ///
    /// The structural check runs first, then a full setup parse that rejects
    /// positions no engine can search (missing kings, the side not to move
    /// in check, impossible castling rights). The stored FEN has its fields
    /// joined by single spaces, so it always fits on one protocol line.
    pub fn parse(fen: &str) -> Result<Self> {
        let normalized = fen.split_whitespace().collect::<Vec<_>>().join(" ");
        let position = Self::new(normalized);
        if !position.validate() {
            return Err(Error::InvalidPosition(fen.to_string()));
        }

        let setup: Fen = position
            .fen
            .parse()
            .map_err(|e| Error::InvalidPosition(format!("{}: {}", fen, e)))?;
        setup
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|e| Error::InvalidPosition(format!("{}: {}", fen, e)))?;

        Ok(position)
    }

    pub fn validate(&self) -> bool {
        let parts: Vec<&str> = self.fen.split_whitespace().collect();
        if parts.len() < 4 {
            return false;
        }

        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return false;
        }

        for rank in ranks {
            let mut count = 0;
            for c in rank.chars() {
                if c.is_ascii_digit() {
                    count += c.to_digit(10).unwrap_or(0);
                } else if "pnbrqkPNBRQK".contains(c) {
                    count += 1;
                } else {
                    return false;
                }
            }
            if count != 8 {
                return false;
            }
        }

        matches!(parts[1], "w" | "b")
    }
}

/// A move in UCI long algebraic form, e.g. `e2e4` or `e7e8q`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Move {
    pub from: String,
    pub to: String,
    pub promotion: Option<char>,
}

impl Move {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, piece: char) -> Self {
        self.promotion = Some(piece);
        self
    }

    pub fn to_uci(&self) -> String {
        match self.promotion {
            Some(p) => format!("{}{}{}", self.from, self.to, p),
            None => format!("{}{}", self.from, self.to),
        }
    }

    pub fn from_uci(uci: &str) -> Option<Self> {
        let bytes = uci.as_bytes();
        if !(4..=5).contains(&bytes.len()) {
            return None;
        }
        if !is_square(&bytes[0..2]) || !is_square(&bytes[2..4]) {
            return None;
        }

        let promotion = match bytes.get(4) {
            None => None,
            Some(&p) if b"qrbn".contains(&p) => Some(p as char),
            Some(_) => return None,
        };

        Some(Self {
            from: uci[0..2].to_string(),
            to: uci[2..4].to_string(),
            promotion,
        })
    }
}

fn is_square(s: &[u8]) -> bool {
    matches!(s, [file, rank] if (b'a'..=b'h').contains(file) && (b'1'..=b'8').contains(rank))
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

//! Semantic-token decoding (spec §4.2 "Semantic tokens decoding").
//!
//! Servers return a flat `uint32[]` where each 5-tuple is
//! `(deltaLine, deltaStart, length, tokenTypeIdx, modifierBitset)`. This
//! module reconstructs absolute positions and resolves both indices through
//! the server's legend.

use lsp_types::SemanticTokensLegend;

use crate::pos::{Position, Range};

/// A single decoded semantic token, with its source text already sliced
/// from the owning file's cached content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub range: Range,
    pub type_name: String,
    pub modifiers: Vec<String>,
    pub text: String,
}

/// Decodes a raw LSP semantic-tokens `data` array against `legend`, slicing
/// token text out of `file_text` via `line_table`.
pub fn decode(
    data: &[u32],
    legend: &SemanticTokensLegend,
    file_text: &str,
    line_table: &crate::pos::LineTable,
) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(data.len() / 5);
    let mut line = 0u32;
    let mut character = 0u32;

    for chunk in data.chunks_exact(5) {
        let [delta_line, delta_start, length, type_idx, modifiers_bitset] = chunk else {
            unreachable!("chunks_exact(5) always yields 5 elements")
        };

        if *delta_line > 0 {
            line += delta_line;
            character = *delta_start;
        } else {
            character += delta_start;
        }

        let start = Position::new(line, character);
        let end = Position::new(line, character + length);
        let range = Range::new(start, end);

        let type_name = legend
            .token_types
            .get(*type_idx as usize)
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let modifiers = decode_modifiers(*modifiers_bitset, legend);

        let start_byte = line_table.byte_offset(file_text, start);
        let end_byte = line_table.byte_offset(file_text, end);
        let text = file_text
            .get(start_byte..end_byte)
            .unwrap_or_default()
            .to_string();

        tokens.push(Token {
            range,
            type_name,
            modifiers,
            text,
        });
    }

    tokens
}

fn decode_modifiers(bitset: u32, legend: &SemanticTokensLegend) -> Vec<String> {
    let mut names = Vec::new();
    for (i, modifier) in legend.token_modifiers.iter().enumerate() {
        if bitset & (1 << i) != 0 {
            names.push(modifier.as_str().to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legend() -> SemanticTokensLegend {
        SemanticTokensLegend {
            token_types: vec!["function".into(), "variable".into()],
            token_modifiers: vec!["declaration".into(), "readonly".into()],
        }
    }

    #[test]
    fn decodes_deltas_into_absolute_positions_and_legend_names() {
        let text = "fn foo() {\n  bar\n}\n";
        let table = crate::pos::LineTable::new(text);
        // token 1: line 0, char 3, len 3, type 0 (function), mods 0b01
        // token 2: delta line 1, char 2, len 3, type 1 (variable), mods 0b10
        let data = [0, 3, 3, 0, 0b01, 1, 2, 3, 1, 0b10];
        let tokens = decode(&data, &legend(), text, &table);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].type_name, "function");
        assert_eq!(tokens[0].modifiers, vec!["declaration"]);
        assert_eq!(tokens[0].text, "foo");
        assert_eq!(tokens[1].type_name, "variable");
        assert_eq!(tokens[1].modifiers, vec!["readonly"]);
        assert_eq!(tokens[1].text, "bar");
    }
}

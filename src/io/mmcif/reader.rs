use crate::io::error::Error;
use crate::model::cif::{Category, DataBlock};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::Peekable;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    quoted: bool,
    line: usize,
}

impl Token {
    fn is_reserved(&self) -> bool {
        !self.quoted
            && (self.text.starts_with('_')
                || starts_with_ci(&self.text, "data_")
                || starts_with_ci(&self.text, "save_")
                || self.text.eq_ignore_ascii_case("loop_")
                || self.text.eq_ignore_ascii_case("global_")
                || self.text.eq_ignore_ascii_case("stop_"))
    }

    fn is_value(&self) -> bool {
        !self.is_reserved()
    }
}

fn starts_with_ci(s: &str, prefix: &str) -> bool {
    s.as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

pub fn read<R: BufRead>(reader: R) -> Result<Vec<DataBlock>, Error> {
    let tokens = tokenize(reader)?;
    let mut blocks: Vec<DataBlock> = Vec::new();
    let mut iter = tokens.into_iter().peekable();

    while let Some(tok) = iter.next() {
        if !tok.quoted && starts_with_ci(&tok.text, "data_") {
            blocks.push(DataBlock::new(&tok.text[5..]));
            continue;
        }

        let Some(block) = blocks.last_mut() else {
            return Err(Error::parse(tok.line, "content before the first data_ block"));
        };

        if !tok.quoted && tok.text.eq_ignore_ascii_case("loop_") {
            read_loop(block, tok.line, &mut iter)?;
        } else if !tok.quoted && tok.text.starts_with('_') {
            let (category, attribute) = split_tag(&tok)?;
            let value = match iter.next() {
                Some(v) if v.is_value() => v.text,
                _ => {
                    return Err(Error::parse(
                        tok.line,
                        format!("missing value for '{}'", tok.text),
                    ));
                }
            };
            block
                .category_or_insert(category)
                .set_value(attribute, 0, value);
        } else {
            return Err(Error::parse(
                tok.line,
                format!("unexpected token '{}'", tok.text),
            ));
        }
    }

    Ok(blocks)
}

pub fn read_path(path: &Path) -> Result<Vec<DataBlock>, Error> {
    let file = File::open(path)?;
    read(BufReader::new(file))
}

/// Reads the first data block of a component file.
pub fn read_first_block(path: &Path) -> Result<DataBlock, Error> {
    read_path(path)?.into_iter().next().ok_or(Error::NoDataBlock)
}

fn read_loop<I>(block: &mut DataBlock, line: usize, iter: &mut Peekable<I>) -> Result<(), Error>
where
    I: Iterator<Item = Token>,
{
    let mut category_name: Option<String> = None;
    let mut attributes = Vec::new();

    while let Some(tok) = iter.next_if(|t| !t.quoted && t.text.starts_with('_')) {
        let (category, attribute) = split_tag(&tok)?;
        match &category_name {
            Some(name) if name != category => {
                return Err(Error::parse(
                    tok.line,
                    format!("loop mixes categories '{}' and '{}'", name, category),
                ));
            }
            Some(_) => {}
            None => category_name = Some(category.to_string()),
        }
        attributes.push(attribute.to_string());
    }

    let Some(category_name) = category_name else {
        return Err(Error::parse(line, "loop_ without tags"));
    };

    let mut values = Vec::new();
    while let Some(tok) = iter.next_if(Token::is_value) {
        values.push(tok.text);
    }

    if values.len() % attributes.len() != 0 {
        return Err(Error::parse(
            line,
            format!(
                "loop for '{}' has {} values for {} columns",
                category_name,
                values.len(),
                attributes.len()
            ),
        ));
    }

    let width = attributes.len();
    let mut category = Category::with_attributes(category_name, attributes);
    let mut values = values.into_iter();
    loop {
        let row: Vec<String> = values.by_ref().take(width).collect();
        if row.is_empty() {
            break;
        }
        category.push_row(row);
    }
    block.replace(category);

    Ok(())
}

fn split_tag(tok: &Token) -> Result<(&str, &str), Error> {
    tok.text[1..]
        .split_once('.')
        .filter(|(c, a)| !c.is_empty() && !a.is_empty())
        .ok_or_else(|| Error::parse(tok.line, format!("malformed tag '{}'", tok.text)))
}

fn tokenize<R: BufRead>(reader: R) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut lines = reader.lines().enumerate();

    while let Some((idx, line)) = lines.next() {
        let line = line?;
        let line_no = idx + 1;

        let Some(first) = line.strip_prefix(';') else {
            split_line(&line, line_no, &mut tokens)?;
            continue;
        };

        let mut parts = Vec::new();
        if !first.is_empty() {
            parts.push(first.to_string());
        }
        let mut rest = None;
        for (_, next) in lines.by_ref() {
            let next = next?;
            if let Some(after) = next.strip_prefix(';') {
                rest = Some(after.to_string());
                break;
            }
            parts.push(next);
        }
        let Some(rest) = rest else {
            return Err(Error::parse(line_no, "unterminated text field"));
        };

        tokens.push(Token {
            text: parts.join("\n"),
            quoted: true,
            line: line_no,
        });
        split_line(&rest, line_no, &mut tokens)?;
    }

    Ok(tokens)
}

fn split_line(line: &str, line_no: usize, tokens: &mut Vec<Token>) -> Result<(), Error> {
    let bytes = line.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if b == b'#' {
            break;
        }

        if b == b'\'' || b == b'"' {
            let start = pos + 1;
            let mut end = start;
            // A quote only closes the string when followed by whitespace or end of line.
            loop {
                if end >= bytes.len() {
                    return Err(Error::parse(line_no, "unterminated quoted string"));
                }
                if bytes[end] == b && (end + 1 == bytes.len() || bytes[end + 1].is_ascii_whitespace())
                {
                    break;
                }
                end += 1;
            }
            tokens.push(Token {
                text: line[start..end].to_string(),
                quoted: true,
                line: line_no,
            });
            pos = end + 1;
            continue;
        }

        let start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        tokens.push(Token {
            text: line[start..pos].to_string(),
            quoted: false,
            line: line_no,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ATP_FRAGMENT: &str = "\
data_ATP
#
_chem_comp.id                 ATP
_chem_comp.name               \"ADENOSINE-5'-TRIPHOSPHATE\"
_chem_comp.type               NON-POLYMER
_chem_comp.pdbx_synonyms      ?
_chem_comp.pdbx_release_status REL
_chem_comp.mon_nstd_parent_comp_id ?
#
loop_
_pdbx_chem_comp_audit.comp_id
_pdbx_chem_comp_audit.action_type
_pdbx_chem_comp_audit.date
_pdbx_chem_comp_audit.processing_site
ATP 'Create component' 1999-07-08 RCSB
ATP 'Modify descriptor' 2011-06-04 RCSB
#
_pdbx_chem_comp_descriptor.comp_id ATP
_pdbx_chem_comp_descriptor.descriptor
;Nc1ncnc2n(cnc12)[C@@H]3O[C@H](CO[P](O)(=O)O[P](O)(=O)O[P](O)(O)=O)[C@@H](O)[C@H]3O
;
";

    #[test]
    fn reads_pairs_loops_and_text_fields() {
        let blocks = read(Cursor::new(ATP_FRAGMENT)).expect("parse");
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];

        assert_eq!(block.name(), "ATP");
        assert_eq!(
            block.single_value("chem_comp", "name"),
            "ADENOSINE-5'-TRIPHOSPHATE"
        );
        assert_eq!(block.single_value("chem_comp", "pdbx_synonyms"), "");
        assert_eq!(block.single_value("chem_comp", "pdbx_release_status"), "REL");

        let audit = block.category("pdbx_chem_comp_audit").unwrap();
        assert_eq!(audit.row_count(), 2);
        assert_eq!(audit.value("action_type", 1), Some("Modify descriptor"));

        assert!(
            block
                .single_value("pdbx_chem_comp_descriptor", "descriptor")
                .starts_with("Nc1ncnc2")
        );
    }

    #[test]
    fn comments_are_ignored() {
        let text = "# header\ndata_X\n_chem_comp.id X # trailing\n";
        let blocks = read(Cursor::new(text)).unwrap();
        assert_eq!(blocks[0].single_value("chem_comp", "id"), "X");
    }

    #[test]
    fn ragged_loop_is_a_parse_error() {
        let text = "data_X\nloop_\n_a.b\n_a.c\n1 2 3\n";
        let err = read(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn unterminated_text_field_is_rejected() {
        let text = "data_X\n_a.b\n;never closed\n";
        assert!(matches!(
            read(Cursor::new(text)),
            Err(Error::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn non_ascii_values_are_read_verbatim() {
        let text = "data_X\n_chem_comp.name abcdé\n_chem_comp.formula 'Ω-ring é'\n";
        let blocks = read(Cursor::new(text)).unwrap();
        assert_eq!(blocks[0].single_value("chem_comp", "name"), "abcdé");
        assert_eq!(blocks[0].single_value("chem_comp", "formula"), "Ω-ring é");
    }

    #[test]
    fn non_ascii_block_names_are_kept() {
        let blocks = read(Cursor::new("data_é\n_a.b 1\n")).unwrap();
        assert_eq!(blocks[0].name(), "é");
    }

    #[test]
    fn value_before_data_block_is_rejected() {
        assert!(read(Cursor::new("_a.b 1\n")).is_err());
    }
}

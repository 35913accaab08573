/// Converts `\n\r`, `\r\n` and lone `\r` line endings to `\n`.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\n\r", "\n")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Lowercased basename of a browser-supplied upload name.
///
/// Some browsers send the full client path, with either separator.
pub fn file_name_of(upload_name: &str) -> String {
    let lower = upload_name.to_lowercase();
    lower
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Splits a list of component ids separated by whitespace, `;` or `,`.
pub fn split_id_list(text: &str) -> Vec<&str> {
    text.split(|c: char| c.is_whitespace() || c == ';' || c == ',')
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newlines_are_normalized() {
        assert_eq!(normalize_newlines("a\r\nb\n\rc\rd\n"), "a\nb\nc\nd\n");
    }

    #[test]
    fn file_name_strips_client_paths() {
        assert_eq!(file_name_of("C:\\Users\\me\\ATP.CIF"), "atp.cif");
        assert_eq!(file_name_of("/home/me/Lig.sdf"), "lig.sdf");
        assert_eq!(file_name_of("x.mol"), "x.mol");
    }

    #[test]
    fn id_lists_split_on_all_separators() {
        assert_eq!(split_id_list("ALA; GLY,SER\nTHR  "), ["ALA", "GLY", "SER", "THR"]);
        assert!(split_id_list("").is_empty());
    }
}

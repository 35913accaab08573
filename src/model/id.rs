use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid character '{ch}' in chemical component id '{id}'")]
pub struct InvalidIdError {
    pub id: String,
    pub ch: char,
}

/// Sites sharing out newly minted component ids.
pub const DEFAULT_SITES: [&str; 3] = ["RCSB", "PDBE", "PDBJ"];

const ID_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Codes that may never be checked in as real components.
pub fn is_reserved(id: &str) -> bool {
    let id = id.to_ascii_uppercase();
    match id.as_str() {
        "DRG" | "INH" | "LIG" => true,
        _ => {
            id.len() == 2
                && id.bytes().all(|b| b.is_ascii_digit())
                && id != "00"
        }
    }
}

/// Reads a component id as a base-36 number over `A-Z0-9` (case-insensitive).
pub fn chem_comp_id_to_int(id: &str) -> Result<u64, InvalidIdError> {
    let base = ID_ALPHABET.len() as u64;
    id.to_ascii_uppercase()
        .chars()
        .try_fold(0u64, |acc, ch| match ID_ALPHABET.find(ch) {
            Some(digit) => Ok(acc.wrapping_mul(base).wrapping_add(digit as u64)),
            None => Err(InvalidIdError {
                id: id.to_string(),
                ch,
            }),
        })
}

/// Site responsible for a component id, spreading ids evenly over `sites`.
pub fn site_for_id<'a>(id: &str, sites: &[&'a str]) -> Result<&'a str, InvalidIdError> {
    let n = chem_comp_id_to_int(id)?;
    Ok(sites[(n % sites.len() as u64) as usize])
}

/// Ids are plain ASCII alphanumerics; anything else is never a real component.
pub fn is_well_formed(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

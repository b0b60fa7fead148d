//! Dummy lab users.
//!
//! Output is reproducible for a given seed.

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

const FIRST_NAMES: [&str; 20] = [
    "Ana", "Luis", "Carlos", "Marta", "Diego", "Laura", "Sofía", "Pablo", "Elena", "Jorge",
    "Lucía", "Raúl", "Noa", "Iván", "Nora", "Hugo", "Valeria", "Bruno", "Irene", "Mateo",
];

const LAST_NAMES: [&str; 20] = [
    "García", "Rodríguez", "López", "Martínez", "Sánchez", "Pérez", "Gómez", "Martín", "Jiménez",
    "Ruiz", "Hernández", "Díaz", "Moreno", "Muñoz", "Álvarez", "Romero", "Navarro", "Torres",
    "Domínguez", "Vargas",
];

const DEPARTMENTS: [&str; 6] = ["QA", "Soporte", "Ventas", "Operaciones", "IT", "Backoffice"];

const SYMBOLS: &[u8] = b"!@#$%^&*";
const PASSWORD_POOL: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";
const PASSWORD_LENGTH: usize = 14;

/// Generator parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyOptions {
    /// Number of users.
    pub count: usize,
    /// Email domain.
    pub domain: String,
    /// Location name written on every row.
    pub location: String,
    /// Country prefix without `+`.
    pub country_code: String,
    /// Extension of user 0; user `i` gets `base + i`.
    pub base_extension: u32,
    /// RNG seed.
    pub seed: u64,
    /// Output CSV.
    pub output: PathBuf,
}

/// One generated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DummyUser {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Display name.
    pub display_name: String,
    /// ASCII email.
    pub email: String,
    /// Extension.
    pub extension: String,
    /// E.164 mobile-range number.
    pub phone_number: String,
    /// Department.
    pub department: String,
    /// Location name.
    pub location: String,
    /// Initial password.
    pub password: String,
}

/// Replaces Spanish accented letters with their ASCII base.
#[must_use]
pub fn fold_ascii(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            'Á' => 'A',
            'É' => 'E',
            'Í' => 'I',
            'Ó' => 'O',
            'Ú' | 'Ü' => 'U',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// Random password with at least one upper, lower, digit and symbol.
///
/// # Errors
///
/// Returns an error when `length` is below 8.
pub fn random_password<R: Rng>(rng: &mut R, length: usize) -> Result<String> {
    if length < 8 {
        return Err(ConfigError::invalid("password length", "must be at least 8").into());
    }
    let mut chars = vec![
        char::from(rng.random_range(b'A'..=b'Z')),
        char::from(rng.random_range(b'a'..=b'z')),
        char::from(rng.random_range(b'0'..=b'9')),
        char::from(SYMBOLS[rng.random_range(0..SYMBOLS.len())]),
    ];
    while chars.len() < length {
        chars.push(char::from(PASSWORD_POOL[rng.random_range(0..PASSWORD_POOL.len())]));
    }
    chars.shuffle(rng);
    Ok(chars.into_iter().collect())
}

/// Generates `options.count` users.
///
/// # Errors
///
/// Returns an error when `count` is zero.
pub fn generate_users(options: &DummyOptions) -> Result<Vec<DummyUser>> {
    if options.count == 0 {
        return Err(ConfigError::invalid("count", "must be greater than 0").into());
    }
    let mut rng = StdRng::seed_from_u64(options.seed);
    (1..=options.count)
        .map(|index| build_user(&mut rng, index, options))
        .collect()
}

fn build_user(rng: &mut StdRng, index: usize, options: &DummyOptions) -> Result<DummyUser> {
    let first_name = *FIRST_NAMES.choose(rng).unwrap_or(&FIRST_NAMES[0]);
    let last_name = *LAST_NAMES.choose(rng).unwrap_or(&LAST_NAMES[0]);
    let unique = format!("{index:03}{}", rng.random_range(10..=99));
    let slug = format!(
        "{}.{}{unique}",
        fold_ascii(first_name).to_lowercase(),
        fold_ascii(last_name).to_lowercase()
    );
    let extension = u64::from(options.base_extension) + index as u64;
    let phone_number = format!(
        "+{}{}",
        options.country_code,
        rng.random_range(600_000_000_u32..=799_999_999)
    );
    let department = *DEPARTMENTS.choose(rng).unwrap_or(&DEPARTMENTS[0]);

    Ok(DummyUser {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        display_name: format!("{first_name} {last_name} LAB {index:03}"),
        email: format!("{slug}@{}", options.domain),
        extension: extension.to_string(),
        phone_number,
        department: department.to_string(),
        location: options.location.clone(),
        password: random_password(rng, PASSWORD_LENGTH)?,
    })
}

/// Writes users as CSV, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_users(path: &Path, users: &[DummyUser]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for user in users {
        writer.serialize(user)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(count: usize, seed: u64) -> DummyOptions {
        DummyOptions {
            count,
            domain: String::from("lab.example.com"),
            location: String::from("LAB-MAD"),
            country_code: String::from("34"),
            base_extension: 4000,
            seed,
            output: PathBuf::from("tmp/dummy_users.csv"),
        }
    }

    #[test]
    fn test_same_seed_same_users() {
        let first = generate_users(&options(5, 42)).expect("users");
        let second = generate_users(&options(5, 42)).expect("users");
        assert_eq!(first, second);
        assert_ne!(first, generate_users(&options(5, 7)).expect("users"));
    }

    #[test]
    fn test_user_fields() {
        let users = generate_users(&options(3, 42)).expect("users");
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].extension, "4001");
        assert_eq!(users[2].extension, "4003");
        for user in &users {
            assert!(user.email.is_ascii());
            assert!(user.email.ends_with("@lab.example.com"));
            assert!(user.phone_number.starts_with("+34"));
            assert!(user.display_name.contains(" LAB "));
            assert_eq!(user.location, "LAB-MAD");
        }
    }

    #[test]
    fn test_password_rules() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let password = random_password(&mut rng, 8).expect("password");
            assert_eq!(password.len(), 8);
            assert!(password.chars().any(|c| c.is_ascii_uppercase()));
            assert!(password.chars().any(|c| c.is_ascii_lowercase()));
            assert!(password.chars().any(|c| c.is_ascii_digit()));
            assert!(password.bytes().any(|b| SYMBOLS.contains(&b)));
        }
        assert!(random_password(&mut rng, 7).is_err());
    }

    #[test]
    fn test_zero_count_is_an_error() {
        let err = generate_users(&options(0, 42)).expect_err("zero");
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn test_fold_ascii() {
        assert_eq!(fold_ascii("Álvarez Muñoz"), "Alvarez Munoz");
    }

    #[test]
    fn test_write_users_csv() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("tmp").join("users.csv");
        let users = generate_users(&options(2, 42)).expect("users");

        write_users(&path, &users).expect("write");
        let content = std::fs::read_to_string(&path).expect("read");
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("first_name,last_name,display_name,email,extension,phone_number,department,location,password")
        );
        assert_eq!(lines.count(), 2);
    }
}

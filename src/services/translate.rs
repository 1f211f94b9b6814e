//! Backend error translation.
//!
//! Maps namespaced backend error codes to the Italian strings shown to users.
//! Every function here is total: any input, including a missing code and a
//! missing message, yields a non-empty string.

use crate::backend::SdkError;

/// Fallback for unrecognized `auth/*` errors without a message.
pub const AUTH_FALLBACK: &str = "Errore di autenticazione. Riprova";
/// Fallback for unrecognized `storage/*` errors without a message.
pub const STORAGE_FALLBACK: &str = "Errore durante l'operazione sul file";
/// Fallback for everything else.
pub const GENERIC_FALLBACK: &str = "Si è verificato un errore. Riprova";

const AUTH_MESSAGES: &[(&str, &str)] = &[
    ("auth/wrong-password", "Password errata"),
    ("auth/user-not-found", "Nessun utente trovato con questa email"),
    ("auth/invalid-email", "Indirizzo email non valido"),
    ("auth/email-already-in-use", "Questa email è già registrata"),
    ("auth/weak-password", "La password deve contenere almeno 6 caratteri"),
    ("auth/too-many-requests", "Troppi tentativi. Riprova più tardi"),
    ("auth/network-request-failed", "Errore di rete. Controlla la connessione"),
    ("auth/user-disabled", "Questo account è stato disabilitato"),
    ("auth/invalid-credential", "Credenziali non valide"),
    ("auth/requires-recent-login", "Effettua di nuovo l'accesso per continuare"),
    ("auth/operation-not-allowed", "Operazione non consentita"),
];

const STORAGE_MESSAGES: &[(&str, &str)] = &[
    ("storage/unauthorized", "Non hai i permessi per accedere a questo file"),
    ("storage/canceled", "Caricamento annullato"),
    ("storage/object-not-found", "File non trovato"),
    ("storage/quota-exceeded", "Spazio di archiviazione esaurito"),
    ("storage/retry-limit-exceeded", "Tempo scaduto. Riprova"),
    ("storage/invalid-checksum", "Il file è danneggiato. Riprova il caricamento"),
    ("storage/unknown", "Errore sconosciuto durante il caricamento"),
];

/// The parts of a backend error the translator reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendErrorInfo {
    /// Namespaced code such as `auth/wrong-password`.
    pub code: Option<String>,
    /// Raw message from the backend.
    pub message: Option<String>,
}

impl BackendErrorInfo {
    /// Creates error info from a code and a message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }

    /// Creates error info carrying only a code.
    #[must_use]
    pub fn from_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: None,
        }
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

impl From<&SdkError> for BackendErrorInfo {
    fn from(err: &SdkError) -> Self {
        Self::new(err.code.clone(), err.message.clone())
    }
}

#[derive(Clone, Copy)]
enum Namespace {
    Auth,
    Storage,
    Other,
}

impl Namespace {
    fn of(code: Option<&str>) -> Self {
        match code {
            Some(c) if c.starts_with("auth/") => Self::Auth,
            Some(c) if c.starts_with("storage/") => Self::Storage,
            _ => Self::Other,
        }
    }

    const fn table(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Auth => AUTH_MESSAGES,
            Self::Storage => STORAGE_MESSAGES,
            Self::Other => &[],
        }
    }

    const fn fallback(self) -> &'static str {
        match self {
            Self::Auth => AUTH_FALLBACK,
            Self::Storage => STORAGE_FALLBACK,
            Self::Other => GENERIC_FALLBACK,
        }
    }
}

fn lookup(table: &[(&str, &'static str)], code: &str) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, m)| *m)
}

fn translate_in(namespace: Namespace, error: &BackendErrorInfo) -> String {
    let code = error.code();
    if let Some(known) = code.and_then(|c| lookup(namespace.table(), c)) {
        return known.to_string();
    }
    error
        .message()
        .map_or_else(|| namespace.fallback().to_string(), str::to_string)
}

/// Translates any backend error into a display string.
///
/// The namespace is taken from the code prefix. Unrecognized codes fall back to
/// the error's own message, then to the namespace's generic string.
#[must_use]
pub fn translate(error: &BackendErrorInfo) -> String {
    translate_in(Namespace::of(error.code()), error)
}

/// Translates an error raised by an auth operation.
///
/// Only `auth/*` codes are looked up; the fallback is the auth generic string.
#[must_use]
pub fn handle_auth_error(error: &BackendErrorInfo) -> String {
    translate_in(Namespace::Auth, error)
}

/// Translates an error raised by a blob store operation.
///
/// Only `storage/*` codes are looked up; the fallback is the storage generic string.
#[must_use]
pub fn handle_storage_error(error: &BackendErrorInfo) -> String {
    translate_in(Namespace::Storage, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("auth/wrong-password", "Password errata")]
    #[test_case("auth/user-not-found", "Nessun utente trovato con questa email")]
    #[test_case("auth/weak-password", "La password deve contenere almeno 6 caratteri")]
    #[test_case("auth/network-request-failed", "Errore di rete. Controlla la connessione")]
    #[test_case("storage/object-not-found", "File non trovato")]
    #[test_case("storage/quota-exceeded", "Spazio di archiviazione esaurito")]
    #[test_case("storage/canceled", "Caricamento annullato")]
    fn test_known_codes(code: &str, expected: &str) {
        assert_eq!(translate(&BackendErrorInfo::from_code(code)), expected);
        assert_eq!(
            translate(&BackendErrorInfo::new(code, "raw backend text")),
            expected
        );
    }

    #[test]
    fn test_unknown_code_uses_message() {
        let info = BackendErrorInfo::new("unknown/x", "Something broke");
        assert_eq!(translate(&info), "Something broke");
    }

    #[test_case(None, GENERIC_FALLBACK; "no code")]
    #[test_case(Some("unknown/x"), GENERIC_FALLBACK; "unknown namespace")]
    #[test_case(Some("auth/brand-new"), AUTH_FALLBACK; "unknown auth code")]
    #[test_case(Some("storage/brand-new"), STORAGE_FALLBACK; "unknown storage code")]
    fn test_fallbacks_without_message(code: Option<&str>, expected: &str) {
        let info = BackendErrorInfo {
            code: code.map(str::to_string),
            message: None,
        };
        assert_eq!(translate(&info), expected);
    }

    #[test]
    fn test_blank_message_counts_as_missing() {
        let info = BackendErrorInfo::new("unknown/x", "   ");
        assert_eq!(translate(&info), GENERIC_FALLBACK);
    }

    #[test]
    fn test_namespaced_handlers() {
        let storage_code = BackendErrorInfo::from_code("storage/unauthorized");
        assert_eq!(handle_auth_error(&storage_code), AUTH_FALLBACK);
        assert_eq!(
            handle_storage_error(&storage_code),
            "Non hai i permessi per accedere a questo file"
        );

        let auth_code = BackendErrorInfo::from_code("auth/user-disabled");
        assert_eq!(
            handle_auth_error(&auth_code),
            "Questo account è stato disabilitato"
        );
        assert_eq!(handle_storage_error(&auth_code), STORAGE_FALLBACK);
        assert_eq!(handle_storage_error(&BackendErrorInfo::default()), STORAGE_FALLBACK);
    }

    #[test]
    fn test_from_sdk_error() {
        let err = SdkError::new("storage/retry-limit-exceeded", "timed out");
        assert_eq!(translate(&(&err).into()), "Tempo scaduto. Riprova");
    }
}

//! User-facing text for the login flow.
//!
//! A [`Messages`] catalog is built once at startup from a [`Locale`] and handed to the
//! components that talk to the user.

use std::str::FromStr;

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    BrazilianPortuguese,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::English => "en-US",
            Locale::BrazilianPortuguese => "pt-BR",
        }
    }

    pub fn all() -> &'static [Locale] {
        &[Locale::English, Locale::BrazilianPortuguese]
    }

    /// Pick a locale from a POSIX `LANG`-style value such as `pt_BR.UTF-8`.
    pub fn from_env_value(value: &str) -> Option<Self> {
        let lang = value.split(['.', '@']).next().unwrap_or_default();
        lang.parse().ok()
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "-").to_ascii_lowercase();
        match normalized.as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::English),
            "pt" | "pt-br" => Ok(Locale::BrazilianPortuguese),
            other if other.starts_with("en-") => Ok(Locale::English),
            other if other.starts_with("pt-") => Ok(Locale::BrazilianPortuguese),
            _ => Err(format!("unsupported language '{}'", s)),
        }
    }
}

/// Localized strings used by the callback pages, the orchestrator and the CLI.
#[derive(Debug, Clone)]
pub struct Messages {
    pub locale: Locale,
    pub success_title: &'static str,
    pub success_lines: [&'static str; 2],
    pub error_title: &'static str,
    pub missing_code: &'static str,
    pub authorization_denied: &'static str,
    pub token_failed: &'static str,
    pub terms: &'static str,
    pub privacy: &'static str,
    pub starting_login: &'static str,
    pub opening_browser: &'static str,
    pub browser_failed: &'static str,
    pub open_manually: &'static str,
    pub waiting_callback: &'static str,
    pub login_succeeded: &'static str,
    pub login_failed: &'static str,
    pub access_token: &'static str,
    pub refresh_token: &'static str,
    pub not_logged_in: &'static str,
    pub logged_in: &'static str,
    pub logged_out: &'static str,
    pub token_expired: &'static str,
    pub expires: &'static str,
}

impl Default for Messages {
    fn default() -> Self {
        Self::for_locale(Locale::default())
    }
}

impl Messages {
    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::English => Self::english(),
            Locale::BrazilianPortuguese => Self::portuguese(),
        }
    }

    fn english() -> Self {
        Self {
            locale: Locale::English,
            success_title: "Success",
            success_lines: [
                "You are now logged in to Nimbus.",
                "You can close this page.",
            ],
            error_title: "Error",
            missing_code: "Missing authorization code",
            authorization_denied: "Authorization was denied",
            token_failed: "Failed to obtain token",
            terms: "Terms of use",
            privacy: "Privacy policy",
            starting_login: "Starting authentication...",
            opening_browser: "Opening browser at",
            browser_failed: "Could not open the browser automatically.",
            open_manually: "Please open this URL manually:",
            waiting_callback: "Waiting for the browser to finish logging in...",
            login_succeeded: "Authentication succeeded!",
            login_failed: "authentication failed",
            access_token: "Access Token",
            refresh_token: "Refresh Token",
            not_logged_in: "Not logged in. Run 'nimbus auth login' to authenticate.",
            logged_in: "Logged in",
            logged_out: "Logged out.",
            token_expired: "expired (will refresh on next use)",
            expires: "Expires",
        }
    }

    fn portuguese() -> Self {
        Self {
            locale: Locale::BrazilianPortuguese,
            success_title: "Sucesso",
            success_lines: [
                "Você fez login com sucesso na Nimbus.",
                "Esta página pode ser fechada agora.",
            ],
            error_title: "Erro",
            missing_code: "Código de autorização ausente",
            authorization_denied: "A autorização foi negada",
            token_failed: "Falha ao obter token",
            terms: "Termos de uso",
            privacy: "Política de privacidade",
            starting_login: "Iniciando processo de autenticação...",
            opening_browser: "Abrindo navegador em",
            browser_failed: "Não foi possível abrir o navegador automaticamente.",
            open_manually: "Por favor, abra manualmente:",
            waiting_callback: "Aguardando a conclusão do login no navegador...",
            login_succeeded: "Autenticação realizada com sucesso!",
            login_failed: "falha na autenticação",
            access_token: "Token de acesso",
            refresh_token: "Token de atualização",
            not_logged_in: "Sem login. Execute 'nimbus auth login' para autenticar.",
            logged_in: "Autenticado",
            logged_out: "Logout realizado.",
            token_expired: "expirado (será renovado no próximo uso)",
            expires: "Expira",
        }
    }
}

use std::fmt;
use std::io;
use std::str::FromStr;

/// Variable selecting the environment. Unset means [`Environment::Dev`].
const APP_ENVIRONMENT: &str = "APP_ENVIRONMENT";

/// Runtime environment of the seeder.
///
/// The environment picks the `configuration/{environment}.*` layer and the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Local runs against developer databases.
    Dev,
    /// Runs against shared benchmark databases.
    Prod,
}

impl Environment {
    pub fn load() -> io::Result<Environment> {
        match std::env::var(APP_ENVIRONMENT) {
            Ok(name) => name.parse(),
            Err(_) => Ok(Environment::Dev),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }

    pub fn is_prod(&self) -> bool {
        *self == Environment::Prod
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = io::Error;

    /// Case-insensitive.
    fn from_str(name: &str) -> io::Result<Self> {
        [Environment::Dev, Environment::Prod]
            .into_iter()
            .find(|environment| environment.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                io::Error::other(format!(
                    "`{name}` is not a supported environment, expected `dev` or `prod`"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_environment_names_case_insensitively() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn only_prod_is_prod() {
        assert!(Environment::Prod.is_prod());
        assert!(!Environment::Dev.is_prod());
    }
}

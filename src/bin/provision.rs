//! Provisioning CLI
//!
//! Prepares a fresh installation: applies migrations, creates the first
//! administrator and loads default settings from a YAML file.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mandato_pro::auth::{NovoUsuario, UserRegistry};
use mandato_pro::configuracoes::ConfiguracaoRegistry;
use mandato_pro::database::models::Perfil;
use mandato_pro::database::Database;

#[derive(Parser)]
#[command(name = "provision")]
#[command(about = "MandatoPro installation tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database URL
    #[arg(long, env = "MANDATO_DATABASE_URL", default_value = "sqlite://mandato.db")]
    database_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Migrate,

    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        nome: String,

        #[arg(long)]
        email: String,

        /// Prefer MANDATO_ADMIN_SENHA or stdin; a flag value shows up in `ps`
        #[arg(long, env = "MANDATO_ADMIN_SENHA", hide_env_values = true)]
        senha: Option<String>,
    },

    /// Load settings from a flat YAML map (`chave: valor`)
    SeedSettings {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let database = Database::new(&cli.database_url).await?;
    database.run_migrations().await?;

    match cli.command {
        Commands::Migrate => {
            println!("Migrations applied to {}", cli.database_url);
        }
        Commands::CreateAdmin { nome, email, senha } => {
            let senha = match senha {
                Some(senha) => senha,
                None => {
                    eprint!("Senha do administrador: ");
                    read_password(std::io::stdin().lock())?
                }
            };
            let usuario = UserRegistry::new(&database)
                .create(
                    None,
                    NovoUsuario {
                        nome,
                        email,
                        senha,
                        perfil: Perfil::Administrador,
                        ativo: true,
                    },
                )
                .await?;
            println!("Administrator {} created with id {}", usuario.email, usuario.id);
        }
        Commands::SeedSettings { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let values: BTreeMap<String, String> = serde_yaml::from_str(&contents)
                .with_context(|| format!("{} is not a flat YAML map", file.display()))?;

            let count = ConfiguracaoRegistry::new(&database).seed(None, &values).await?;
            println!("{} settings stored", count);
        }
    }

    Ok(())
}

/// First line of `input`, without the line ending
fn read_password(mut input: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read the password from stdin")?;
    let senha = line.trim_end_matches(['\r', '\n']).to_string();
    anyhow::ensure!(!senha.is_empty(), "no password given");
    Ok(senha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create_admin_without_password_flag() {
        let cli = Cli::try_parse_from([
            "provision",
            "create-admin",
            "--nome",
            "Administrador",
            "--email",
            "admin@gabinete.gov.br",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::CreateAdmin { .. }));
    }

    #[test]
    fn test_password_from_stdin() {
        let senha = read_password(std::io::Cursor::new("senha segura 123\r\nresto")).unwrap();
        assert_eq!(senha, "senha segura 123");
        assert!(read_password(std::io::Cursor::new("\n")).is_err());
        assert!(read_password(std::io::Cursor::new("")).is_err());
    }
}

//! GnuPG decryption of downloaded files
//!
//! The private key is fetched once per run from SSM, imported into the
//! configured keyring, and then each encrypted handle is spooled to a temp
//! file and decrypted with the `gpg` executable.

use aws_config::BehaviorVersion;
use aws_sdk_ssm::error::DisplayErrorContext;
use std::cell::Cell;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info};

use crate::config::DecryptionConfig;
use crate::error::DecryptError;

/// A decrypted local copy of a remote file. The file is deleted on drop.
pub struct DecryptedFile {
    path: TempPath,
    reader: File,
}

impl DecryptedFile {
    /// Take ownership of a temp file holding decrypted contents.
    pub fn from_temp_path(path: TempPath) -> io::Result<Self> {
        let reader = File::open(&path)?;
        Ok(Self { path, reader })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for DecryptedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for DecryptedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedFile")
            .field("path", &self.path())
            .finish()
    }
}

/// Turns an encrypted handle into a readable plaintext file
pub trait Decryptor {
    /// `source_path` is the remote path, used for naming and diagnostics.
    fn decrypt(&self, encrypted: &mut dyn Read, source_path: &str)
        -> Result<DecryptedFile, DecryptError>;
}

/// Where the armored private key comes from
pub trait KeySource {
    fn private_key(&self, key_name: &str) -> Result<String, DecryptError>;
}

/// Reads a SecureString parameter with the AWS SDK, using the default
/// credential chain and region.
#[derive(Debug, Default, Clone)]
pub struct SsmKeySource {
    endpoint_url: Option<String>,
}

impl SsmKeySource {
    /// Send SSM requests to `url` instead of the regional endpoint.
    pub fn with_endpoint_url(url: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(url.into()),
        }
    }

    async fn fetch(&self, key_name: &str) -> Result<Option<String>, DecryptError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(url) = &self.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let sdk_config = loader.load().await;
        let client = aws_sdk_ssm::Client::new(&sdk_config);

        let output = client
            .get_parameter()
            .name(key_name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|err| DecryptError::Ssm {
                key_name: key_name.to_string(),
                message: DisplayErrorContext(&err).to_string(),
                source: Box::new(err),
            })?;

        Ok(output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string))
    }
}

impl KeySource for SsmKeySource {
    fn private_key(&self, key_name: &str) -> Result<String, DecryptError> {
        debug!(key_name, "fetching private key from SSM");
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let value = rt.block_on(self.fetch(key_name))?;

        let key = value.unwrap_or_default().trim().to_string();
        if key.is_empty() {
            return Err(DecryptError::EmptyKey(key_name.to_string()));
        }
        Ok(key)
    }
}

/// `gpg`-backed decryptor
pub struct GpgDecryptor<K: KeySource = SsmKeySource> {
    config: DecryptionConfig,
    key_source: K,
    key_imported: Cell<bool>,
}

impl GpgDecryptor<SsmKeySource> {
    pub fn new(config: DecryptionConfig) -> Self {
        Self::with_key_source(config, SsmKeySource::default())
    }
}

impl<K: KeySource> GpgDecryptor<K> {
    pub fn with_key_source(config: DecryptionConfig, key_source: K) -> Self {
        Self {
            config,
            key_source,
            key_imported: Cell::new(false),
        }
    }

    fn gpg_command(&self, gpg: &Path) -> Command {
        let mut cmd = Command::new(gpg);
        cmd.arg("--homedir")
            .arg(&self.config.gnupghome)
            .args(["--batch", "--yes"]);
        cmd
    }

    fn ensure_key_imported(&self, gpg: &Path) -> Result<(), DecryptError> {
        if self.key_imported.get() {
            return Ok(());
        }

        let key = self.key_source.private_key(&self.config.ssm_key_name)?;
        let mut cmd = self.gpg_command(gpg);
        cmd.arg("--import");
        run_with_stdin(cmd, key.as_bytes(), "import")?;

        info!(
            key_name = %self.config.ssm_key_name,
            gnupghome = %self.config.gnupghome.display(),
            "imported decryption key"
        );
        self.key_imported.set(true);
        Ok(())
    }
}

impl<K: KeySource> Decryptor for GpgDecryptor<K> {
    fn decrypt(
        &self,
        encrypted: &mut dyn Read,
        source_path: &str,
    ) -> Result<DecryptedFile, DecryptError> {
        let gpg = locate("gpg")?;
        self.ensure_key_imported(&gpg)?;

        let mut spooled = NamedTempFile::new()?;
        let bytes = io::copy(encrypted, spooled.as_file_mut())?;
        spooled.as_file_mut().flush()?;
        debug!(source_path, bytes, "spooled encrypted file");

        let output_path = NamedTempFile::new()?.into_temp_path();

        let mut cmd = self.gpg_command(&gpg);
        cmd.args(["--pinentry-mode", "loopback", "--passphrase-fd", "0", "--output"])
            .arg(&*output_path)
            .arg("--decrypt")
            .arg(spooled.path());
        let passphrase = format!("{}\n", self.config.passphrase);
        run_with_stdin(cmd, passphrase.as_bytes(), "decrypt")?;

        info!(source_path, decrypted = %output_path.display(), "decrypted file");
        Ok(DecryptedFile::from_temp_path(output_path)?)
    }
}

fn locate(tool: &'static str) -> Result<PathBuf, DecryptError> {
    which::which(tool).map_err(|source| DecryptError::ToolNotFound { tool, source })
}

fn run_with_stdin(mut cmd: Command, input: &[u8], action: &'static str) -> Result<(), DecryptError> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    // gpg may exit before reading stdin; its status and stderr say why.
    if let Some(mut stdin) = child.stdin.take() {
        match stdin.write_all(input) {
            Err(err) if err.kind() != io::ErrorKind::BrokenPipe => return Err(err.into()),
            _ => {}
        }
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(DecryptError::Command {
            tool: "gpg",
            action,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

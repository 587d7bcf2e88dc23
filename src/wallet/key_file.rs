use crate::error::{LedgerError, Result};
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use log::info;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use zeroize::Zeroizing;

/// Load the wallet stored at `path`, or generate one and write it there.
///
/// The file holds the hex encoded PKCS#8 document and nothing else.
pub fn load_or_create(path: &Path) -> Result<Wallet> {
    if path.exists() {
        return load(path);
    }

    let (wallet, pkcs8) = Wallet::generate()?;
    save(path, &pkcs8)?;
    info!(
        "New wallet created at {}: {}",
        path.display(),
        wallet.get_address()
    );
    Ok(wallet)
}

pub fn load(path: &Path) -> Result<Wallet> {
    let contents = Zeroizing::new(fs::read_to_string(path)?);
    let pkcs8 = Zeroizing::new(
        HEXLOWER
            .decode(contents.trim().as_bytes())
            .map_err(|e| LedgerError::Crypto(format!("Corrupt wallet file: {e}")))?,
    );
    Wallet::from_pkcs8(&pkcs8)
}

fn save(path: &Path, pkcs8: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut options = OpenOptions::new();
    options.create(true).truncate(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        // owner read/write only
        options.mode(0o600);
    }
    let file = options.open(path)?;
    let mut writer = BufWriter::new(file);
    let encoded = Zeroizing::new(HEXLOWER.encode(pkcs8));
    writer.write_all(encoded.as_bytes())?;
    writer.flush()?;
    Ok(())
}

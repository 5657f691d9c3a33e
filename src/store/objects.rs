//! Filesystem-backed object storage for saved source images, plus the
//! signed URLs used to hand them back out.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::Mac;
use uuid::Uuid;

use crate::auth::{keyed_mac, HmacSha256};
use crate::error::{AppError, Result};

pub const BUCKET: &str = "analyses";
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Storage rooted at `<data_dir>/objects/analyses`.
    pub fn open(data_dir: &Path) -> std::io::Result<Self> {
        let root = data_dir.join("objects").join(BUCKET);
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Writes a JPEG under the user's prefix and returns its object path.
    pub async fn put_jpeg(&self, user_id: Uuid, jpeg: &[u8]) -> Result<String> {
        let suffix = Uuid::new_v4().simple().to_string();
        let path = format!(
            "{}/{}-{}.jpg",
            user_id,
            Utc::now().timestamp_millis(),
            &suffix[..8]
        );
        let file = self.resolve(&path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, jpeg).await?;
        tracing::debug!(path = %path, bytes = jpeg.len(), "stored object");
        Ok(path)
    }

    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.resolve(path)?;
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound("Object".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removing an object that is already gone is not an error.
    pub async fn remove(&self, path: &str) -> Result<()> {
        let file = self.resolve(path)?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path, "object already missing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Only `<uuid>/<name>.jpg` paths map onto the filesystem.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let invalid = || AppError::NotFound("Object".into());
        let (user, name) = path.split_once('/').ok_or_else(invalid)?;
        Uuid::parse_str(user).map_err(|_| invalid())?;
        let valid_name = name.ends_with(".jpg")
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            && !name.starts_with('.');
        if !valid_name {
            return Err(invalid());
        }
        Ok(self.root.join(user).join(name))
    }
}

/// Decodes a `data:` URL (or bare base64) and re-encodes it as JPEG.
pub fn decode_to_jpeg(data_url: &str) -> Result<Vec<u8>> {
    let encoded = match data_url.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| AppError::InvalidImage("malformed data URL".into()))?,
        None => data_url,
    };

    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::InvalidImage(e.to_string()))?;

    let img = image::load_from_memory(&bytes).map_err(|e| AppError::InvalidImage(e.to_string()))?;

    let mut jpeg = Vec::new();
    image::DynamicImage::ImageRgb8(img.to_rgb8())
        .write_to(
            &mut Cursor::new(&mut jpeg),
            image::ImageOutputFormat::Jpeg(JPEG_QUALITY),
        )
        .map_err(|e| AppError::InvalidImage(e.to_string()))?;

    Ok(jpeg)
}

/// Mints and checks time-limited download URLs for stored objects.
#[derive(Debug, Clone)]
pub struct UrlSigner {
    secret: String,
    ttl: Duration,
}

impl UrlSigner {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn signed_url(&self, path: &str) -> String {
        let expires = self.expiry(Utc::now().timestamp());
        format!(
            "/storage/v1/object/sign/{}/{}?expires={}&token={}",
            BUCKET,
            path,
            expires,
            self.token(path, expires)
        )
    }

    /// Saturates instead of wrapping for absurdly long TTLs.
    fn expiry(&self, now: i64) -> i64 {
        i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .unwrap_or(i64::MAX)
    }

    pub fn verify(&self, path: &str, expires: i64, token: &str) -> bool {
        if expires < Utc::now().timestamp() {
            return false;
        }
        match hex::decode(token) {
            Ok(tag) => self.mac(path, expires).verify_slice(&tag).is_ok(),
            Err(_) => false,
        }
    }

    fn token(&self, path: &str, expires: i64) -> String {
        hex::encode(self.mac(path, expires).finalize().into_bytes())
    }

    fn mac(&self, path: &str, expires: i64) -> HmacSha256 {
        let mut mac = keyed_mac(&self.secret, b"signed-url\n");
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_data_url() -> String {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png))
    }

    #[test]
    fn data_url_is_reencoded_as_jpeg() {
        let jpeg = decode_to_jpeg(&png_data_url()).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn garbage_is_an_invalid_image() {
        assert!(matches!(
            decode_to_jpeg("data:image/png;base64,bm90IGFuIGltYWdl"),
            Err(AppError::InvalidImage(_))
        ));
        assert!(matches!(decode_to_jpeg("data:nocomma"), Err(AppError::InvalidImage(_))));
    }

    #[tokio::test]
    async fn put_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path()).unwrap();
        let user = Uuid::new_v4();

        let path = store.put_jpeg(user, b"jpeg").await.unwrap();
        assert!(path.starts_with(&format!("{user}/")));
        assert_eq!(store.get(&path).await.unwrap(), b"jpeg");

        store.remove(&path).await.unwrap();
        assert!(matches!(store.get(&path).await, Err(AppError::NotFound(_))));
        store.remove(&path).await.unwrap();
    }

    #[test]
    fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path()).unwrap();
        let user = Uuid::new_v4();
        assert!(store.resolve(&format!("{user}/../../etc.jpg")).is_err());
        assert!(store.resolve("../x/y.jpg").is_err());
        assert!(store.resolve(&format!("{user}/ok-1.jpg")).is_ok());
    }

    #[test]
    fn signed_urls_verify_until_expiry() {
        let signer = UrlSigner::new("k", Duration::from_secs(60));
        let url = signer.signed_url("u/p.jpg");
        let query = url.split_once('?').unwrap().1;
        let (expires, token) = query.split_once('&').unwrap();
        let expires: i64 = expires.trim_start_matches("expires=").parse().unwrap();
        let token = token.trim_start_matches("token=");

        assert!(signer.verify("u/p.jpg", expires, token));
        assert!(!signer.verify("u/other.jpg", expires, token));
        assert!(!signer.verify("u/p.jpg", expires + 1, token));

        let past = Utc::now().timestamp() - 10;
        assert!(!signer.verify("u/p.jpg", past, &signer.token("u/p.jpg", past)));
        assert!(!signer.verify("u/p.jpg", expires, "zz"));
    }

    #[test]
    fn tokens_are_hmac_sha256_over_path_and_expiry() {
        let signer = UrlSigner::new("k", Duration::from_secs(60));
        let mut mac = HmacSha256::new_from_slice(b"k").unwrap();
        mac.update(b"signed-url\nu/p.jpg\n1700000000");
        let expected = hex::encode(mac.finalize().into_bytes());
        assert_eq!(signer.token("u/p.jpg", 1_700_000_000), expected);

        // A session tag for the same secret is never a valid URL token.
        let session = crate::auth::SessionKeys::new("k").issue(Uuid::nil());
        let tag = session.split_once('.').unwrap().1;
        assert!(!signer.verify("u/p.jpg", i64::MAX, tag));
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        let signer = UrlSigner::new("k", Duration::MAX);
        assert_eq!(signer.expiry(Utc::now().timestamp()), i64::MAX);

        let url = signer.signed_url("u/p.jpg");
        assert!(url.contains(&format!("expires={}", i64::MAX)));
        let token = url.rsplit_once("token=").unwrap().1;
        assert!(signer.verify("u/p.jpg", i64::MAX, token));

        let within_range = UrlSigner::new("k", Duration::from_secs(10));
        assert_eq!(within_range.expiry(i64::MAX - 5), i64::MAX);
        assert_eq!(within_range.expiry(100), 110);
    }
}

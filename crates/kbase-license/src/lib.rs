//! License management on top of a pluggable repository.

pub mod repo;

use chrono::Utc;
use kbase_types::{
    license::{License, LicenseKind, LicenseResp, LICENSE_EDITION, LICENSE_STATE},
    KbaseError, Result,
};
use tracing::info;

pub use repo::{InMemoryLicenseRepository, JsonFileLicenseRepository, LicenseRepository};

/// What an administrator handed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseUpload {
    Code(String),
    File(Vec<u8>),
}

pub struct LicenseUsecase<R: LicenseRepository> {
    repo: R,
}

impl<R: LicenseRepository> LicenseUsecase<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn get_license(&self) -> Result<LicenseResp> {
        let license = self.repo.get_license().await?;
        Ok(LicenseResp {
            edition: LICENSE_EDITION,
            state: LICENSE_STATE,
            kind: license.as_ref().map(|l| l.kind),
            code: license.map(|l| l.code),
        })
    }

    pub async fn upload_license(&self, upload: LicenseUpload) -> Result<LicenseResp> {
        let license = match upload {
            LicenseUpload::Code(code) if !code.trim().is_empty() => License {
                kind: LicenseKind::Code,
                data: code.as_bytes().to_vec(),
                code,
                created_at: Utc::now(),
            },
            LicenseUpload::File(data) if !data.is_empty() => License {
                kind: LicenseKind::File,
                code: String::new(),
                data,
                created_at: Utc::now(),
            },
            _ => {
                return Err(license_error(
                    "either license code or license file is required",
                ))
            }
        };

        info!("Storing {:?} license ({} bytes)", license.kind, license.data.len());
        self.repo.create_license(license).await?;
        self.get_license().await
    }

    pub async fn delete_license(&self) -> Result<()> {
        info!("Deleting installed license");
        self.repo.delete_license().await
    }
}

pub fn license_error(message: impl Into<String>) -> KbaseError {
    KbaseError::License(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usecase() -> LicenseUsecase<InMemoryLicenseRepository> {
        LicenseUsecase::new(InMemoryLicenseRepository::new())
    }

    #[tokio::test]
    async fn reports_edition_without_license() {
        let resp = usecase().get_license().await.expect("get");
        assert_eq!(
            resp,
            LicenseResp {
                edition: 3,
                state: 1,
                kind: None,
                code: None,
            }
        );
    }

    #[tokio::test]
    async fn code_upload_is_reported_back() {
        let usecase = usecase();
        let resp = usecase
            .upload_license(LicenseUpload::Code("KB-1234".into()))
            .await
            .expect("upload");
        assert_eq!(resp.kind, Some(LicenseKind::Code));
        assert_eq!(resp.code.as_deref(), Some("KB-1234"));
        assert_eq!(resp.edition, LICENSE_EDITION);
    }

    #[tokio::test]
    async fn file_upload_replaces_code() {
        let usecase = usecase();
        usecase
            .upload_license(LicenseUpload::Code("old".into()))
            .await
            .expect("upload code");
        let resp = usecase
            .upload_license(LicenseUpload::File(b"-----LICENSE-----".to_vec()))
            .await
            .expect("upload file");
        assert_eq!(resp.kind, Some(LicenseKind::File));
        assert_eq!(resp.code.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let usecase = usecase();
        for upload in [LicenseUpload::Code("  ".into()), LicenseUpload::File(Vec::new())] {
            let err = usecase.upload_license(upload).await.unwrap_err();
            assert!(matches!(err, KbaseError::License(_)));
        }
        assert_eq!(usecase.get_license().await.expect("get").kind, None);
    }

    #[tokio::test]
    async fn delete_clears_license() {
        let usecase = usecase();
        usecase
            .upload_license(LicenseUpload::Code("KB".into()))
            .await
            .expect("upload");
        usecase.delete_license().await.expect("delete");
        assert_eq!(usecase.get_license().await.expect("get").code, None);
    }

    #[test]
    fn response_serializes_type_field() {
        let resp = LicenseResp {
            edition: 3,
            state: 1,
            kind: Some(LicenseKind::File),
            code: Some(String::new()),
        };
        let json = serde_json::to_value(&resp).expect("encode");
        assert_eq!(json["type"], "file");
        assert_eq!(json["edition"], 3);
    }
}

//! Upload batching with rollback.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{trace, warn};

use scribe_core::{MediaStore, Result, UploadedFile};

/// Upload every file in order.
///
/// If one upload fails, the files already stored by this call are discarded
/// and the upload error is returned.
pub async fn upload_all(
    media: &Arc<dyn MediaStore>,
    files: &[UploadedFile],
) -> Result<Vec<String>> {
    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        match media.upload(file).await {
            Ok(url) => {
                trace!(
                    subsystem = "media",
                    op = "upload",
                    bytes = file.size(),
                    "Stored attachment"
                );
                urls.push(url);
            }
            Err(e) => {
                discard_all(media, &urls).await;
                return Err(e);
            }
        }
    }
    Ok(urls)
}

/// Best-effort removal; failures are logged and swallowed.
pub async fn discard_all(media: &Arc<dyn MediaStore>, urls: &[String]) {
    let results = join_all(urls.iter().map(|url| media.discard(url))).await;
    for (url, result) in urls.iter().zip(results) {
        if let Err(e) = result {
            warn!(
                subsystem = "media",
                op = "discard",
                url = %url,
                error = %e,
                "Could not remove stored object"
            );
        }
    }
}

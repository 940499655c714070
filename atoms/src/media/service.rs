use super::model::PhotoProof;
use crate::store::ObjectStore;
use crate::time::Clock;
use crate::Result;

/// Upload raw photo bytes and return the stable reference that goes on
/// the task row.
pub async fn upload_photo_proof(
    objects: &dyn ObjectStore,
    clock: &dyn Clock,
    task_id: &str,
    bytes: Vec<u8>,
) -> Result<PhotoProof> {
    let key = format!("proofs/{}/{}.jpg", task_id, uuid::Uuid::new_v4());
    let reference = objects.put_object(&key, bytes, "image/jpeg").await?;
    Ok(PhotoProof {
        reference,
        uploaded_at: clock.now(),
    })
}

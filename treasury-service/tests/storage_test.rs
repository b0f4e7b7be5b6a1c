//! File key scheme and local storage round-trips.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use treasury_service::services::storage::{
    content_type_for, generate_file_key, sanitize_file_name, FileStore, LocalStorage,
};

#[test]
fn sanitize_strips_accents_and_lowercases() {
    assert_eq!(sanitize_file_name("Facturá Ñoño.PDF"), "factura_nono.pdf");
    assert_eq!(sanitize_file_name("comprobante-01.pdf"), "comprobante-01.pdf");
    assert_eq!(sanitize_file_name("pago (marzo).xml"), "pago__marzo_.xml");
}

#[test]
fn key_scheme_is_deterministic_for_a_fixed_instant() {
    let now = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();
    let key = generate_file_key("facturas", "Factura Méx.pdf", now);
    assert_eq!(
        key,
        format!("facturas/2026/03/{}-factura_mex.pdf", now.timestamp_millis())
    );
}

#[test]
fn content_type_detection_by_extension() {
    assert_eq!(content_type_for("f.pdf"), "application/pdf");
    assert_eq!(content_type_for("REP.XML"), "application/xml");
    assert_eq!(content_type_for("scan.jpeg"), "image/jpeg");
    assert_eq!(content_type_for("blob"), "application/octet-stream");
}

#[tokio::test]
async fn local_upload_and_download_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path()).await.unwrap();
    let store = FileStore::new(Arc::new(storage));

    let stored = store
        .upload(b"contenido".to_vec(), "facturas", "factura.pdf", "application/pdf")
        .await
        .unwrap();

    assert!(stored.key.starts_with("facturas/"));
    assert!(stored.key.ends_with("-factura.pdf"));
    assert_eq!(stored.url, format!("/uploads/{}", stored.key));
    assert_eq!(stored.storage, "local");

    let data = store.download(&stored.key).await.unwrap();
    assert_eq!(data, b"contenido");
}

#[tokio::test]
async fn staging_places_files_under_temp() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(Arc::new(LocalStorage::new(dir.path()).await.unwrap()));

    let staged = store
        .stage_temp(b"borrador".to_vec(), "Factura Pendiente.pdf")
        .await
        .unwrap();

    assert!(staged.key.starts_with("temp/"));
    assert!(staged.key.ends_with("factura_pendiente.pdf"));
    assert_eq!(staged.file_name, "Factura Pendiente.pdf");
    assert!(store.temp_exists(&staged.key).await);
}

#[tokio::test]
async fn promotion_moves_content_and_removes_the_temp_copy() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(Arc::new(LocalStorage::new(dir.path()).await.unwrap()));

    let staged = store
        .stage_temp(b"factura definitiva".to_vec(), "factura.pdf")
        .await
        .unwrap();

    let stored = store
        .promote_temp(&staged.key, "facturas", "factura.pdf")
        .await
        .unwrap();

    assert!(stored.key.starts_with("facturas/"));
    assert!(!store.temp_exists(&staged.key).await);

    let data = store.download(&stored.key).await.unwrap();
    assert_eq!(data, b"factura definitiva");
}

#[tokio::test]
async fn promoting_a_missing_temp_key_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(Arc::new(LocalStorage::new(dir.path()).await.unwrap()));

    let result = store
        .promote_temp("temp/does-not-exist.pdf", "facturas", "f.pdf")
        .await;
    assert!(result.is_err());
}

//! Error surface of the store and plot layers

use plotstore::prelude::*;
use plotstore::store::{MAX_CHUNK_SIZE, MAX_RECORD_PAYLOAD};

#[test]
fn test_memory_limit_reports_out_of_memory() {
    let config = StoreConfig::new(64).with_memory_limit(128);
    let mut manager = ChunkManager::new("bounded", config);
    // 26-byte payloads frame to 32 bytes: two per chunk, two chunks fit
    for _ in 0..4 {
        manager.append_bytes(&[0; 26]).unwrap();
    }
    let err = manager.append_bytes(&[0; 26]).unwrap_err();
    assert_eq!(
        err,
        StoreError::OutOfMemory {
            requested: 64,
            limit: 128
        }
    );
    assert_eq!(manager.record_count(), 4);
    assert_eq!(manager.allocated_bytes(), 128);
}

#[test]
fn test_graph_refuses_record_over_limit() {
    let mut graph = Graph::with_config("tiny", 0, StoreConfig::new(64).with_memory_limit(64));
    assert!(graph.add_line(0.0, 0.0, 1.0, 1.0, 0));
    assert!(!graph.add_line(1.0, 0.0, 2.0, 1.0, 1));
    assert_eq!(graph.object_count(), 1);
    assert_eq!(graph.extents(), Some(Extent::new(0.0, 1.0, 0.0, 1.0)));
}

#[test]
fn test_record_too_large() {
    let mut manager = ChunkManager::new("big", StoreConfig::default());
    let err = manager.append(MAX_RECORD_PAYLOAD + 1).unwrap_err();
    assert!(matches!(err, StoreError::RecordTooLarge { .. }));
    assert!(MAX_RECORD_PAYLOAD + 6 <= MAX_CHUNK_SIZE);
}

#[test]
fn test_geometry_anomaly_from_try_append() {
    let mut graph = Graph::new("g", 0, 4);
    let err = graph
        .try_append(GraphicalObject::Line {
            geometry: plotstore::store::Geometry::new(-3.0, 0.0, 1.0, 1.0, 0),
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::GeometryAnomaly { .. }));
    assert!(err.to_string().contains("less than 0"));
    assert!(!err.is_corruption());
}

#[test]
fn test_decode_rejects_garbage() {
    let err = GraphicalObject::decode(&[0xff; 40], 16).unwrap_err();
    assert!(err.is_corruption());
    let err = GraphicalObject::decode(&[1, 0], 0).unwrap_err();
    assert!(matches!(err, StoreError::Decode { .. }));
}

#[test]
fn test_error_display() {
    let err = StoreError::corruption(2, 0x40, 0x5555, 0x1234);
    assert_eq!(
        err.to_string(),
        "Corruption detected in chunk 2 at offset 0x00000040: expected tag 0x5555, found 0x1234"
    );
    assert_eq!(
        StoreError::UnknownSubPlot { id: 4 }.to_string(),
        "Unknown sub-plot: 4"
    );
}

#[test]
fn test_store_error_into_anyhow() {
    fn fails() -> anyhow::Result<()> {
        Err::<(), _>(StoreError::invalid_label("empty"))?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(err.downcast_ref::<StoreError>().is_some());
}

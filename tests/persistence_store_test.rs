use chrono::Duration;
use scholar_flow::persistence::{
    AggregateField, FieldCount, InMemoryReferenceStore, QueryOptions, RecordFilter,
    ReferenceDraft, ReferencePatch, ReferenceStore, SortField, SortOrder, StoreError,
};
use scholar_flow::refinery::DocumentType;

fn draft(title: &str, discipline: &str, document_type: DocumentType) -> ReferenceDraft {
    ReferenceDraft::builder(title)
        .authors(vec!["Grace Hopper".to_string()])
        .abstract_text(Some(format!("Abstract of {}", title)))
        .discipline(discipline)
        .document_type(document_type)
        .build()
}

async fn seeded() -> InMemoryReferenceStore {
    let store = InMemoryReferenceStore::new();
    for (title, discipline, document_type) in [
        ("Compilers in Practice", "Computer Science", DocumentType::Book),
        ("Protein Folding Dynamics", "Biology", DocumentType::Journal),
        ("Distributed Consensus", "Computer Science", DocumentType::Journal),
        ("Coral Reef Survey", "Biology", DocumentType::Report),
        ("Type Systems Thesis", "Computer Science", DocumentType::Thesis),
    ] {
        store.save(draft(title, discipline, document_type)).await.unwrap();
    }
    store
}

#[tokio::test]
async fn test_round_trip() {
    let store = InMemoryReferenceStore::new();
    let saved = store
        .save(draft("Round Trip", "General", DocumentType::Journal))
        .await
        .unwrap();

    let found = store.find_by_id(&saved.id).await.unwrap().unwrap();
    assert_eq!(found.title, "Round Trip");
    assert_eq!(found.authors, vec!["Grace Hopper"]);
    assert_eq!(found.created_at, found.updated_at);

    // * JSON keeps the wire names and survives a round trip
    let json = serde_json::to_string(&found).unwrap();
    assert!(json.contains("\"type\":\"journal\""));
    let decoded: scholar_flow::persistence::ReferenceRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, found);
}

#[tokio::test]
async fn test_save_rejects_invalid_draft() {
    let store = InMemoryReferenceStore::new();
    let result = store.save(ReferenceDraft::builder("   ").build()).await;
    assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    assert_eq!(store.count(RecordFilter::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_find_with_filters() {
    let store = seeded().await;

    let cs = store
        .find(
            RecordFilter {
                discipline: Some("Computer Science".to_string()),
                ..Default::default()
            },
            QueryOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(cs.len(), 3);

    let journals = RecordFilter {
        document_type: Some(DocumentType::Journal),
        ..Default::default()
    };
    assert_eq!(store.count(journals).await.unwrap(), 2);

    let search = RecordFilter {
        search: Some("hopper".to_string()),
        ..Default::default()
    };
    assert_eq!(store.count(search).await.unwrap(), 5);

    let search = RecordFilter {
        search: Some("coral".to_string()),
        ..Default::default()
    };
    let hits = store.find(search, QueryOptions::default()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Coral Reef Survey");
}

#[tokio::test]
async fn test_sorting_and_paging() {
    let store = seeded().await;
    let options = QueryOptions {
        sort: SortField::Title,
        order: SortOrder::Asc,
        skip: 1,
        limit: Some(2),
    };

    let page = store.find(RecordFilter::default(), options).await.unwrap();
    let titles: Vec<_> = page.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Coral Reef Survey", "Distributed Consensus"]);
}

#[tokio::test]
async fn test_update_bookmark_and_rate() {
    let store = seeded().await;
    let target = store
        .find(RecordFilter::default(), QueryOptions::newest(1))
        .await
        .unwrap()
        .remove(0);

    let updated = store
        .update(
            &target.id,
            ReferencePatch {
                tags: Some(vec!["to-read".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.tags, vec!["to-read"]);
    assert!(updated.updated_at >= updated.created_at);

    let bookmarked = store.toggle_bookmark(&target.id).await.unwrap().unwrap();
    assert!(bookmarked.bookmarked);
    let unbookmarked = store.toggle_bookmark(&target.id).await.unwrap().unwrap();
    assert!(!unbookmarked.bookmarked);

    assert_eq!(store.rate(&target.id, 5).await.unwrap().unwrap().rating, Some(5));
    assert!(matches!(
        store.rate(&target.id, 0).await,
        Err(StoreError::InvalidInput(_))
    ));

    assert!(store.toggle_bookmark("missing").await.unwrap().is_none());
    assert!(store.rate("missing", 3).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete() {
    let store = seeded().await;
    let target = store
        .find(RecordFilter::default(), QueryOptions::newest(1))
        .await
        .unwrap()
        .remove(0);

    let removed = store.delete(&target.id).await.unwrap().unwrap();
    assert_eq!(removed.id, target.id);
    assert!(store.find_by_id(&target.id).await.unwrap().is_none());
    assert!(store.delete(&target.id).await.unwrap().is_none());
    assert_eq!(store.count(RecordFilter::default()).await.unwrap(), 4);
}

#[tokio::test]
async fn test_aggregates_and_overview() {
    let store = seeded().await;

    let disciplines = store
        .aggregate_by_field(AggregateField::Discipline)
        .await
        .unwrap();
    assert_eq!(
        disciplines,
        vec![
            FieldCount { value: "Computer Science".to_string(), count: 3 },
            FieldCount { value: "Biology".to_string(), count: 2 },
        ]
    );

    let types = store
        .aggregate_by_field(AggregateField::DocumentType)
        .await
        .unwrap();
    assert_eq!(types[0], FieldCount { value: "journal".to_string(), count: 2 });
    assert_eq!(types.iter().map(|t| t.count).sum::<usize>(), 5);

    let overview = store.overview().await.unwrap();
    assert_eq!(overview.total, 5);
    assert_eq!(overview.recent.len(), 5);
    assert_eq!(overview.discipline_stats, disciplines);
    for pair in overview.recent.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

#[test]
fn test_patch_never_moves_updated_at_backwards() {
    let mut record = scholar_flow::persistence::ReferenceRecord::from_draft(
        draft("Clock Skew", "General", DocumentType::Journal),
        chrono::Utc::now(),
    );
    let skewed = record.created_at - Duration::minutes(5);
    ReferencePatch {
        rating: Some(3),
        ..Default::default()
    }
    .apply(&mut record, skewed);

    assert_eq!(record.updated_at, record.created_at);
    assert_eq!(record.rating, Some(3));
}

//! # Paginated Collector
//!
//! Pulls cells from a [`CellSource`] stream one at a time, decodes them and
//! applies the listing filters until the page is full.
//!
//! Filter order is fixed: supported content type, then the caller's
//! content-type allow-list, then the cluster. Every pulled cell counts
//! toward `scanned`, whichever filter drops it.

use futures::TryStreamExt;
use tracing::debug;

use super::record_codec;
use crate::adapters::{CellMatcher, CellSource};
use crate::domain::{HexBytes, Page, RecordError, Spore};

/// Filters applied after decoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectFilters {
    /// Caller allow-list of content types.
    pub content_types: Option<Vec<String>>,
    /// Required cluster.
    pub cluster_id: Option<HexBytes>,
}

/// One collection request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectRequest {
    /// Which cells to stream.
    pub matcher: CellMatcher,
    /// Post-decode filters.
    pub filters: CollectFilters,
    /// Keep content bytes.
    pub include_content: bool,
    /// Page size; `None` drains the source.
    pub limit: Option<usize>,
}

/// Why a decoded record was not accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rejection {
    UnsupportedType,
    ContentTypeFiltered,
    ClusterFiltered,
}

fn screen(
    spore: &Spore,
    filters: &CollectFilters,
    is_supported: &impl Fn(&str) -> bool,
) -> Result<(), Rejection> {
    if !is_supported(&spore.content_type) {
        return Err(Rejection::UnsupportedType);
    }
    if let Some(allowed) = &filters.content_types {
        if !allowed.iter().any(|t| *t == spore.content_type) {
            return Err(Rejection::ContentTypeFiltered);
        }
    }
    if let Some(cluster) = &filters.cluster_id {
        if spore.cluster_id.as_ref() != Some(cluster) {
            return Err(Rejection::ClusterFiltered);
        }
    }
    Ok(())
}

/// Collect one page of records.
///
/// `limit == Some(0)` returns an empty page without touching the source.
/// Malformed cells are counted and skipped.
pub async fn collect(
    source: &CellSource,
    request: CollectRequest,
    is_supported: impl Fn(&str) -> bool,
) -> Result<Page, RecordError> {
    if request.limit == Some(0) {
        return Ok(Page::default());
    }

    let mut cells = source.collect_cells(request.matcher);
    let mut page = Page::default();

    while let Some(cell) = cells.try_next().await? {
        page.scanned += 1;

        let out_point = cell.out_point;
        let spore = match record_codec::decode(cell.data.as_bytes(), cell.cell_ref(), request.include_content) {
            Ok(spore) => spore,
            Err(e) => {
                debug!("[spore] Skipping cell {:?}#{}: {}", out_point.tx_hash, out_point.index, e);
                continue;
            }
        };

        if let Err(reason) = screen(&spore, &request.filters, &is_supported) {
            debug!("[spore] Filtered {} ({:?})", spore.id, reason);
            continue;
        }

        page.items.push(spore);
        if request.limit == Some(page.items.len()) {
            break;
        }
    }

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        invariant_page_bounds, CellOutput, HashType, Script, ScriptId, SporeData, H256,
    };
    use crate::ports::outbound::{MockCalls, MockChain};
    use std::sync::Arc;

    fn spore_id() -> ScriptId {
        ScriptId::new(H256([0xaa; 32]), HashType::Data1)
    }

    fn mint(chain: &mut MockChain, id: u8, content_type: &str, cluster: Option<u8>) {
        let data = SporeData {
            content_type: content_type.to_string(),
            content: vec![id],
            cluster_id: cluster.map(|c| vec![c; 32]),
        };
        chain.commit(
            vec![],
            vec![(
                CellOutput {
                    capacity: 1,
                    lock: Script::new(H256([0xcc; 32]), HashType::Type, HexBytes::new(vec![1])),
                    type_: Some(spore_id().with_args(HexBytes::new(vec![id]))),
                },
                record_codec::encode(&data),
            )],
        );
    }

    fn request(limit: Option<usize>) -> CollectRequest {
        CollectRequest {
            matcher: CellMatcher::by_type(spore_id().any_instance()),
            filters: CollectFilters::default(),
            include_content: false,
            limit,
        }
    }

    fn supported(content_type: &str) -> bool {
        content_type.starts_with("image/")
    }

    fn ids(page: &Page) -> Vec<u8> {
        page.items.iter().map(|s| s.id.as_bytes()[0]).collect()
    }

    /// Minted oldest-first so that the descending stream yields a, b, c.
    fn abc_chain() -> Arc<MockChain> {
        let mut chain = MockChain::default();
        mint(&mut chain, 0xc, "image/png", Some(1));
        mint(&mut chain, 0xb, "unknown/x", None);
        mint(&mut chain, 0xa, "image/png", Some(1));
        Arc::new(chain)
    }

    #[tokio::test]
    async fn test_cluster_filter_counts_every_scanned_cell() {
        let chain = abc_chain();
        let source = CellSource::new(chain.clone(), chain, 10);
        let mut req = request(Some(10));
        req.filters.cluster_id = Some(HexBytes::new(vec![1; 32]));

        let page = collect(&source, req, supported).await.unwrap();
        assert_eq!(ids(&page), vec![0xa, 0xc]);
        assert_eq!(page.scanned, 3);
        assert!(invariant_page_bounds(&page, Some(10)));
    }

    #[tokio::test]
    async fn test_limit_zero_touches_nothing() {
        let chain = abc_chain();
        let source = CellSource::new(chain.clone(), chain.clone(), 10);
        let page = collect(&source, request(Some(0)), supported).await.unwrap();
        assert_eq!(page, Page::default());
        assert_eq!(MockCalls::get(&chain.calls.get_cells), 0);
    }

    #[tokio::test]
    async fn test_stops_pulling_once_limit_reached() {
        let mut chain = MockChain::default();
        for id in 0..10 {
            mint(&mut chain, id, "image/png", None);
        }
        let chain = Arc::new(chain);
        let source = CellSource::new(chain.clone(), chain.clone(), 2);

        let page = collect(&source, request(Some(3)), supported).await.unwrap();
        assert_eq!(ids(&page), vec![9, 8, 7]);
        assert_eq!(page.scanned, 3);
        // pages [9,8] and [7,6]; nothing after the third accepted cell
        assert_eq!(MockCalls::get(&chain.calls.get_cells), 2);
    }

    #[tokio::test]
    async fn test_content_type_filter_precedes_cluster_filter() {
        let mut chain = MockChain::default();
        mint(&mut chain, 1, "image/jpeg", Some(1));
        mint(&mut chain, 2, "image/png", Some(2));
        mint(&mut chain, 3, "image/png", Some(1));
        let chain = Arc::new(chain);
        let source = CellSource::new(chain.clone(), chain, 10);

        let mut req = request(None);
        req.filters.content_types = Some(vec!["image/png".to_string()]);
        req.filters.cluster_id = Some(HexBytes::new(vec![1; 32]));

        let page = collect(&source, req, supported).await.unwrap();
        assert_eq!(ids(&page), vec![3]);
        assert_eq!(page.scanned, 3);
    }

    #[tokio::test]
    async fn test_malformed_cells_are_skipped_but_counted() {
        let mut chain = MockChain::default();
        mint(&mut chain, 1, "image/png", None);
        chain.commit(
            vec![],
            vec![(
                CellOutput {
                    capacity: 1,
                    lock: Script::new(H256([0xcc; 32]), HashType::Type, HexBytes::default()),
                    type_: Some(spore_id().with_args(HexBytes::new(vec![2]))),
                },
                vec![0xff, 0x00],
            )],
        );
        let chain = Arc::new(chain);
        let source = CellSource::new(chain.clone(), chain, 10);

        let page = collect(&source, request(None), supported).await.unwrap();
        assert_eq!(ids(&page), vec![1]);
        assert_eq!(page.scanned, 2);
    }

    #[tokio::test]
    async fn test_include_content() {
        let mut chain = MockChain::default();
        mint(&mut chain, 7, "image/png", None);
        let chain = Arc::new(chain);
        let source = CellSource::new(chain.clone(), chain, 10);

        let mut req = request(None);
        req.include_content = true;
        let page = collect(&source, req, supported).await.unwrap();
        assert_eq!(page.items[0].content, Some(HexBytes::new(vec![7])));
    }

    #[tokio::test]
    async fn test_empty_source() {
        let chain = Arc::new(MockChain::default());
        let source = CellSource::new(chain.clone(), chain, 10);
        let page = collect(&source, request(Some(5)), supported).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.scanned, 0);
    }
}

//! [Tibber](https://developer.tibber.com/docs/overview) GraphQL client.

use std::{
    future::Future,
    ops::{ControlFlow, RangeInclusive},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};

use crate::{
    core::{provider::SeriesProvider, record::HourlyRecord},
    prelude::*,
};

pub struct Api(Client);

impl Api {
    const URL: &'static str = "https://api.tibber.com/v1-beta/gql";

    /// A month of hours per page.
    const PAGE_SIZE: u32 = 744;

    pub fn try_new(access_token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {access_token}"))
                .context("invalid access token")?,
        );
        let client = Client::builder()
            .user_agent("hindsight")
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self(client))
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(after = ?after))]
    async fn get_page(&self, after: Option<String>) -> Result<Option<Connection>> {
        let response = self
            .0
            .post(Self::URL)
            .json(&Request::new(Self::PAGE_SIZE, after.as_deref()))
            .send()
            .await
            .context("failed to call Tibber")?
            .error_for_status()
            .context("Tibber request failed")?
            .json::<Response>()
            .await
            .context("failed to deserialize the Tibber response")?;
        response.into_connection()
    }
}

#[async_trait]
impl SeriesProvider for Api {
    /// Page through the hourly consumption until the window end is passed.
    #[instrument(skip_all, fields(since = %window.start(), until = %window.end()))]
    async fn get_series(
        &self,
        window: &RangeInclusive<DateTime<Utc>>,
    ) -> Result<Vec<HourlyRecord>> {
        let series = paginate(window, |after| self.get_page(after)).await?;
        info!(n_records = series.len(), "fetched");
        Ok(series)
    }
}

/// Follow the page cursors until the window end is passed or the pages run out.
async fn paginate<F, Fut>(
    window: &RangeInclusive<DateTime<Utc>>,
    mut get_page: F,
) -> Result<Vec<HourlyRecord>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Option<Connection>>>,
{
    let mut series = Vec::new();
    let mut after: Option<String> = None;

    loop {
        let Some(connection) = get_page(after.take()).await? else {
            warn!("no consumption in the response");
            break;
        };
        if connection.nodes.is_empty() {
            break;
        }
        info!(n_nodes = connection.nodes.len(), n_total = series.len(), "loaded a page");
        let page_info = connection.page_info;
        if extend_within(&mut series, connection.nodes, window).is_break()
            || !page_info.has_next_page
        {
            break;
        }
        let Some(end_cursor) = page_info.end_cursor else {
            warn!("the next page is announced but there is no cursor");
            break;
        };
        after = Some(end_cursor);
    }

    Ok(series)
}

/// Append the nodes that fall into the window.
///
/// Nodes without a timestamp are dropped. Breaks on the first node past the window end.
fn extend_within(
    series: &mut Vec<HourlyRecord>,
    nodes: Vec<HourlyRecord>,
    window: &RangeInclusive<DateTime<Utc>>,
) -> ControlFlow<()> {
    for node in nodes {
        let Some(from) = node.from else {
            debug!("dropping a node without timestamp");
            continue;
        };
        if from < *window.start() {
            continue;
        }
        if from > *window.end() {
            return ControlFlow::Break(());
        }
        series.push(node);
    }
    ControlFlow::Continue(())
}

#[derive(Serialize)]
struct Request<'a> {
    #[serde(rename = "operationName")]
    operation_name: &'static str,

    query: &'static str,

    variables: Variables<'a>,
}

impl<'a> Request<'a> {
    const fn new(first: u32, after: Option<&'a str>) -> Self {
        Self {
            operation_name: "Consumption",
            query: "query Consumption($first: Int!, $after: String) { viewer { homes { consumption(resolution: HOURLY, first: $first, after: $after) { pageInfo { endCursor hasNextPage } nodes { from to unitPrice unitPriceVAT consumption consumptionUnit } } } } }",
            variables: Variables { first, after },
        }
    }
}

#[derive(Serialize)]
struct Variables<'a> {
    first: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<&'a str>,
}

#[derive(Deserialize)]
struct Response {
    data: Option<Data>,

    #[serde(default)]
    errors: Vec<ResponseError>,
}

impl Response {
    fn into_connection(self) -> Result<Option<Connection>> {
        if !self.errors.is_empty() {
            bail!(
                "Tibber responded with errors: {}",
                self.errors.iter().map(|error| error.message.as_str()).join("; "),
            );
        }
        let Some(data) = self.data else {
            return Ok(None);
        };
        if data.viewer.homes.len() > 1 {
            warn!(n_homes = data.viewer.homes.len(), "multiple homes, using the first one");
        }
        Ok(data.viewer.homes.into_iter().next().and_then(|home| home.consumption))
    }
}

#[derive(Deserialize)]
struct ResponseError {
    message: String,
}

#[derive(Deserialize)]
struct Data {
    viewer: Viewer,
}

#[derive(Deserialize)]
struct Viewer {
    #[serde(default)]
    homes: Vec<Home>,
}

#[derive(Deserialize)]
struct Home {
    consumption: Option<Connection>,
}

#[derive(Deserialize)]
struct Connection {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,

    #[serde(default)]
    nodes: Vec<HourlyRecord>,
}

#[derive(Deserialize)]
struct PageInfo {
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,

    #[serde(default, rename = "hasNextPage")]
    has_next_page: bool,
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use chrono::TimeZone;

    use super::*;
    use crate::quantity::energy::KilowattHours;

    const PAGE: &str = r#"{
        "data": {
            "viewer": {
                "homes": [{
                    "consumption": {
                        "pageInfo": { "endCursor": "MjAyNC0xMC0wMQ==", "hasNextPage": true },
                        "nodes": [
                            { "from": "2024-09-30T23:00:00.000+00:00", "to": "2024-10-01T00:00:00.000+00:00", "unitPrice": 0.2, "unitPriceVAT": 0.04, "consumption": 0.5, "consumptionUnit": "kWh" },
                            { "from": "2024-10-01T00:00:00.000+00:00", "to": "2024-10-01T01:00:00.000+00:00", "unitPrice": 0.1, "unitPriceVAT": 0.02, "consumption": 0.7, "consumptionUnit": "kWh" },
                            { "from": null, "unitPrice": 0.1, "unitPriceVAT": 0.02, "consumption": 0.7 },
                            { "from": "2024-10-01T01:00:00.000+00:00", "to": "2024-10-01T02:00:00.000+00:00", "unitPrice": 0.3, "unitPriceVAT": 0.06, "consumption": null, "consumptionUnit": "kWh" },
                            { "from": "2024-10-01T02:00:00.000+00:00", "to": "2024-10-01T03:00:00.000+00:00", "unitPrice": 0.3, "unitPriceVAT": 0.06, "consumption": 1.1, "consumptionUnit": "kWh" }
                        ]
                    }
                }]
            }
        }
    }"#;

    fn window(until_hour: u32) -> RangeInclusive<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap()
            ..=Utc.with_ymd_and_hms(2024, 10, 1, until_hour, 0, 0).unwrap()
    }

    fn page() -> Connection {
        serde_json::from_str::<Response>(PAGE).unwrap().into_connection().unwrap().unwrap()
    }

    #[test]
    fn test_parse_page() {
        let connection = page();
        assert!(connection.page_info.has_next_page);
        assert_eq!(connection.page_info.end_cursor.as_deref(), Some("MjAyNC0xMC0wMQ=="));
        assert_eq!(connection.nodes.len(), 5);
        assert_eq!(connection.nodes[1].consumption, Some(KilowattHours(0.7)));
        assert_eq!(connection.nodes[3].consumption, None);
    }

    #[test]
    fn test_extend_within_window() {
        let mut series = Vec::new();
        let flow = extend_within(&mut series, page().nodes, &window(23));
        assert!(flow.is_continue());
        // Skips the one before the window and the one without timestamp, keeps the invalid one:
        assert_eq!(series.len(), 3);
        assert!(series.iter().is_sorted_by_key(|record| record.from));
        assert!(series[1].validate().is_none());
    }

    #[test]
    fn test_extend_stops_past_window_end() {
        let mut series = Vec::new();
        let flow = extend_within(&mut series, page().nodes, &window(1));
        assert!(flow.is_break());
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_graphql_errors() {
        let response: Response = serde_json::from_str(
            r#"{ "data": null, "errors": [{ "message": "invalid token" }, { "message": "oops" }] }"#,
        )
        .unwrap();
        let error = response.into_connection().err().unwrap();
        assert_eq!(error.to_string(), "Tibber responded with errors: invalid token; oops");
    }

    #[test]
    fn test_no_homes() {
        let response: Response =
            serde_json::from_str(r#"{ "data": { "viewer": { "homes": [] } } }"#).unwrap();
        assert!(response.into_connection().unwrap().is_none());
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(Request::new(744, Some("cursor"))).unwrap();
        assert_eq!(body["operationName"], "Consumption");
        assert_eq!(body["variables"]["first"], 744);
        assert_eq!(body["variables"]["after"], "cursor");

        let body = serde_json::to_value(Request::new(744, None)).unwrap();
        assert!(body["variables"].get("after").is_none());
    }

    fn node(hour: u32) -> HourlyRecord {
        let from = Utc.with_ymd_and_hms(2024, 10, 1, hour, 0, 0).unwrap();
        HourlyRecord {
            from: Some(from),
            consumption: Some(KilowattHours(0.5)),
            ..HourlyRecord::default()
        }
    }

    fn connection(hours: &[u32], end_cursor: Option<&str>, has_next_page: bool) -> Connection {
        Connection {
            page_info: PageInfo { end_cursor: end_cursor.map(str::to_string), has_next_page },
            nodes: hours.iter().copied().map(node).collect(),
        }
    }

    /// Replay the pages in order and return the series together with the requested cursors.
    async fn paginate_pages(
        window: &RangeInclusive<DateTime<Utc>>,
        pages: Vec<Option<Connection>>,
    ) -> (Vec<HourlyRecord>, Vec<Option<String>>) {
        let mut pages = VecDeque::from(pages);
        let mut cursors = Vec::new();
        let series = paginate(window, |after| {
            cursors.push(after);
            let page = pages.pop_front().flatten();
            async move { Ok(page) }
        })
        .await
        .unwrap();
        (series, cursors)
    }

    #[tokio::test]
    async fn test_paginate_follows_cursor() {
        let (series, cursors) = paginate_pages(
            &window(23),
            vec![
                Some(connection(&[0, 1], Some("first"), true)),
                Some(connection(&[2, 3], Some("second"), false)),
                Some(connection(&[4], None, false)),
            ],
        )
        .await;
        assert_eq!(series.len(), 4);
        assert_eq!(series[2], node(2));
        assert_eq!(cursors, [None, Some("first".to_string())]);
    }

    #[tokio::test]
    async fn test_paginate_stops_on_empty_page() {
        let (series, cursors) = paginate_pages(
            &window(23),
            vec![
                Some(connection(&[0], Some("first"), true)),
                Some(connection(&[], Some("second"), true)),
                Some(connection(&[1], None, false)),
            ],
        )
        .await;
        assert_eq!(series, [node(0)]);
        assert_eq!(cursors.len(), 2);
    }

    #[tokio::test]
    async fn test_paginate_stops_without_cursor() {
        let (series, cursors) = paginate_pages(
            &window(23),
            vec![Some(connection(&[0], None, true)), Some(connection(&[1], None, false))],
        )
        .await;
        assert_eq!(series, [node(0)]);
        assert_eq!(cursors, [None]);
    }

    #[tokio::test]
    async fn test_paginate_stops_past_window_end() {
        let (series, cursors) = paginate_pages(
            &window(1),
            vec![
                Some(connection(&[0, 1, 2], Some("first"), true)),
                Some(connection(&[3], None, false)),
            ],
        )
        .await;
        assert_eq!(series, [node(0), node(1)]);
        assert_eq!(cursors.len(), 1);
    }

    #[tokio::test]
    async fn test_paginate_without_consumption() {
        let (series, cursors) = paginate_pages(&window(23), vec![None]).await;
        assert!(series.is_empty());
        assert_eq!(cursors.len(), 1);
    }

    #[tokio::test]
    #[ignore = "makes the API request"]
    async fn test_get_series_ok() -> Result {
        let access_token = std::env::var("TIBBER_ACCESS_TOKEN")?;
        let now = Utc::now();
        let series = Api::try_new(&access_token)?
            .get_series(&((now - chrono::TimeDelta::days(7))..=now))
            .await?;
        assert!(!series.is_empty());
        assert!(series.iter().is_sorted_by_key(|record| record.from));
        Ok(())
    }
}

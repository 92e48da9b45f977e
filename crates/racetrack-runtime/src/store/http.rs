//! HTTP store client
//!
//! Talks to a json-server style backend: collections under `/garage` and
//! `/winners`, engine transitions via `PATCH /engine`, page totals in the
//! `X-Total-Count` header.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use racetrack_core::{
    config::ServerConfig, garage_query, Car, CarId, DriveFailure, DriveOutcome, EngineStart,
    EngineStatus, NewCar, Page, RaceError, RaceResult, RemoteStore, WinnerLookup, WinnerRecord,
    WinnersQuery,
};

const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// `RemoteStore` over HTTP
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: Url,
}

impl HttpStore {
    pub fn new(config: &ServerConfig) -> RaceResult<Self> {
        let base_url = config.parsed_base_url()?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| RaceError::Configuration {
            reason: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> RaceResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RaceError::Configuration {
                reason: format!("base_url {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> RaceResult<Response> {
        debug!(request = context, "sending");
        let response = request.send().await.map_err(RaceError::transport)?;
        debug!(request = context, status = response.status().as_u16(), "response");
        Ok(response)
    }

    async fn engine(&self, id: &CarId, status: EngineStatus) -> RaceResult<Response> {
        let url = self.endpoint(&["engine"])?;
        let request = self
            .client
            .patch(url)
            .query(&[("id", id.as_str()), ("status", status.as_str())]);
        self.send(request, &format!("PATCH /engine {id} {status}"))
            .await
    }
}

/// Fail on anything but 2xx.
fn expect_success(response: Response, context: &str) -> RaceResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RaceError::status(status.as_u16(), context))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> RaceResult<T> {
    response.json::<T>().await.map_err(RaceError::transport)
}

/// Read a listing page, falling back to the item count when the total header is missing.
async fn read_page<T: DeserializeOwned>(response: Response) -> RaceResult<Page<T>> {
    let total = response
        .headers()
        .get(TOTAL_COUNT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u32>().ok());
    let items: Vec<T> = read_json(response).await?;
    let total_count = total.unwrap_or(items.len() as u32);
    Ok(Page::new(items, total_count))
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn list_cars(&self, page: u32, limit: u32) -> RaceResult<Page<Car>> {
        let url = self.endpoint(&["garage"])?;
        let context = "GET /garage";
        let response = self
            .send(self.client.get(url).query(&garage_query(page, limit)), context)
            .await?;
        read_page(expect_success(response, context)?).await
    }

    async fn list_all_cars(&self) -> RaceResult<Vec<Car>> {
        let url = self.endpoint(&["garage"])?;
        let context = "GET /garage";
        let response = self.send(self.client.get(url), context).await?;
        read_json(expect_success(response, context)?).await
    }

    async fn get_car(&self, id: &CarId) -> RaceResult<Car> {
        let url = self.endpoint(&["garage", id.as_str()])?;
        let context = format!("GET /garage/{id}");
        let response = self.send(self.client.get(url), &context).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RaceError::NotFound {
                resource: format!("car {id}"),
            });
        }
        read_json(expect_success(response, &context)?).await
    }

    async fn create_car(&self, car: &NewCar) -> RaceResult<Car> {
        let url = self.endpoint(&["garage"])?;
        let context = "POST /garage";
        let response = self.send(self.client.post(url).json(car), context).await?;
        read_json(expect_success(response, context)?).await
    }

    async fn update_car(&self, id: &CarId, car: &NewCar) -> RaceResult<Car> {
        let url = self.endpoint(&["garage", id.as_str()])?;
        let context = format!("PUT /garage/{id}");
        let response = self.send(self.client.put(url).json(car), &context).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RaceError::NotFound {
                resource: format!("car {id}"),
            });
        }
        read_json(expect_success(response, &context)?).await
    }

    async fn delete_car(&self, id: &CarId) -> RaceResult<()> {
        let url = self.endpoint(&["garage", id.as_str()])?;
        let context = format!("DELETE /garage/{id}");
        let response = self.send(self.client.delete(url), &context).await?;
        expect_success(response, &context).map(drop)
    }

    async fn set_engine(&self, id: &CarId, status: EngineStatus) -> RaceResult<EngineStart> {
        let response = self.engine(id, status).await?;
        let context = format!("PATCH /engine {id} {status}");
        read_json(expect_success(response, &context)?).await
    }

    async fn drive(&self, id: &CarId) -> RaceResult<DriveOutcome> {
        let response = self.engine(id, EngineStatus::Drive).await?;
        let status = response.status();
        if status == StatusCode::OK {
            Ok(DriveOutcome::Finished)
        } else {
            Ok(DriveOutcome::Broken(DriveFailure::from_status(status.as_u16())))
        }
    }

    async fn list_winners(&self, query: &WinnersQuery) -> RaceResult<Page<WinnerRecord>> {
        let url = self.endpoint(&["winners"])?;
        let context = "GET /winners";
        let response = self
            .send(self.client.get(url).query(&query.to_pairs()), context)
            .await?;
        read_page(expect_success(response, context)?).await
    }

    async fn get_winner(&self, id: &CarId) -> RaceResult<WinnerLookup> {
        let url = self.endpoint(&["winners", id.as_str()])?;
        let context = format!("GET /winners/{id}");
        let response = self.send(self.client.get(url), &context).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(WinnerLookup::NotFound);
        }
        let record = read_json(expect_success(response, &context)?).await?;
        Ok(WinnerLookup::Found(record))
    }

    async fn create_winner(&self, record: &WinnerRecord) -> RaceResult<()> {
        let url = self.endpoint(&["winners"])?;
        let context = "POST /winners";
        let response = self.send(self.client.post(url).json(record), context).await?;
        expect_success(response, context).map(drop)
    }

    async fn update_winner(&self, record: &WinnerRecord) -> RaceResult<()> {
        let url = self.endpoint(&["winners", record.id.as_str()])?;
        let context = format!("PUT /winners/{}", record.id);
        let response = self.send(self.client.put(url).json(record), &context).await?;
        expect_success(response, &context).map(drop)
    }

    async fn delete_winner(&self, id: &CarId) -> RaceResult<()> {
        let url = self.endpoint(&["winners", id.as_str()])?;
        let context = format!("DELETE /winners/{id}");
        let response = self.send(self.client.delete(url), &context).await?;
        expect_success(response, &context).map(drop)
    }
}

//! HTTP client for the DeSo node API and GraphQL indexer.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

use super::types::{
    ExchangeRateResponse, GraphQlRequest, GraphQlResponse, HoldersRequest, HoldersResponse,
    LockedAggregateData, ProfileRequest, ProfileResponse, StakeEntriesRequest,
    StakeEntriesResponse, UsersRequest, UsersResponse, ValidatorsRequest, ValidatorsResponse,
};
use super::{
    adapter, AccountIdentity, HolderPage, IndexSource, LedgerSource, PriceOracle, ValidatorInfo,
};
use crate::model::{sanitize_amount, AccountId, StakeEntry, TokenSpec, TokenSymbol};
use crate::utils::config::{
    DEFAULT_REQUEST_TIMEOUT, EXCHANGE_RATE_PATH, HOLDERS_PATH, NATIVE_SYMBOL, PROFILE_PATH,
    STAKE_ENTRIES_PATH, TOTAL_SUPPLY_PATH, USERS_PATH, VALIDATORS_PATH,
};
use crate::utils::error::SourceError;

/// Upper bound on validators requested in one list call
const VALIDATOR_LIST_LIMIT: usize = 1000;

/// Aggregate of native coin locked in CCv1 creator coins
const CCV1_LOCKED_QUERY: &str =
    "query Ccv1Locked { profiles { aggregates { sum { desoLockedNanos } } } }";

/// Client for one DeSo node and its GraphQL indexer
pub struct DesoClient {
    client: Client,
    api_url: String,
    graphql_url: String,
    native_symbol: String,
}

impl DesoClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `api_url` - Node API base URL (e.g. `https://node.deso.org`)
    /// * `graphql_url` - GraphQL indexer endpoint
    pub fn new(
        api_url: impl Into<String>,
        graphql_url: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(SourceError::TransportFailure)?;

        Ok(Self {
            client,
            api_url: normalize_base_url(&api_url.into()),
            graphql_url: graphql_url.into(),
            native_symbol: NATIVE_SYMBOL.to_string(),
        })
    }

    /// Symbol the exchange-rate endpoint prices (defaults to DESO)
    pub fn with_native_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.native_symbol = symbol.into();
        self
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, SourceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.api_url, path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;
        decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    async fn profile(&self, request: &ProfileRequest) -> Result<ProfileResponse, SourceError> {
        self.post(PROFILE_PATH, request).await
    }

    async fn stake_entries(
        &self,
        request: &StakeEntriesRequest,
    ) -> Result<Vec<StakeEntry>, SourceError> {
        let response: StakeEntriesResponse = self.post(STAKE_ENTRIES_PATH, request).await?;
        adapter::stake_entries(response)
    }
}

/// Check the status, then decode the body.
///
/// Body decoding goes through `serde_json` so a bad payload is a
/// `MalformedResponse` rather than a transport failure.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SourceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::HttpStatus {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Strip trailing slashes so paths can be appended directly
fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[async_trait]
impl LedgerSource for DesoClient {
    async fn resolve_identity(
        &self,
        account_id: Option<&str>,
        username: Option<&str>,
    ) -> Result<AccountIdentity, SourceError> {
        let request = ProfileRequest {
            public_key: account_id.map(str::to_string),
            username: username.map(str::to_string),
        };
        adapter::identity(self.profile(&request).await?)
    }

    async fn balances(
        &self,
        account_id: &str,
        tokens: &[TokenSpec],
    ) -> Result<BTreeMap<TokenSymbol, f64>, SourceError> {
        let request = UsersRequest {
            public_keys: vec![account_id.to_string()],
            skip_for_leaderboard: false,
        };
        let response: UsersResponse = self.post(USERS_PATH, &request).await?;
        let user = adapter::single_user(response, account_id)?;
        adapter::balances(&user, tokens)
    }

    async fn account_stakes(&self, account_id: &str) -> Result<Vec<StakeEntry>, SourceError> {
        self.stake_entries(&StakeEntriesRequest {
            staker: Some(account_id.to_string()),
            validator: None,
        })
        .await
    }

    async fn validators(&self) -> Result<Vec<ValidatorInfo>, SourceError> {
        let response: ValidatorsResponse = self
            .post(
                VALIDATORS_PATH,
                &ValidatorsRequest {
                    limit: VALIDATOR_LIST_LIMIT,
                },
            )
            .await?;
        adapter::validators(response)
    }

    async fn validator_stakers(&self, validator_id: &str) -> Result<Vec<StakeEntry>, SourceError> {
        self.stake_entries(&StakeEntriesRequest {
            staker: None,
            validator: Some(validator_id.to_string()),
        })
        .await
    }

    async fn usernames(
        &self,
        account_ids: &[AccountId],
    ) -> Result<BTreeMap<AccountId, String>, SourceError> {
        let request = UsersRequest {
            public_keys: account_ids.to_vec(),
            skip_for_leaderboard: true,
        };
        let response: UsersResponse = self.post(USERS_PATH, &request).await?;
        Ok(adapter::usernames(response))
    }

    async fn total_supply(&self) -> Result<f64, SourceError> {
        let supply: f64 = self.get(TOTAL_SUPPLY_PATH).await?;
        Ok(sanitize_amount(supply))
    }

    async fn token_supply(&self, token: &TokenSpec) -> Result<f64, SourceError> {
        let Some(creator) = &token.creator else {
            return Ok(0.0);
        };
        let request = ProfileRequest {
            public_key: Some(creator.clone()),
            username: None,
        };
        adapter::token_supply(self.profile(&request).await?, token)
    }
}

#[async_trait]
impl IndexSource for DesoClient {
    async fn holders_page(
        &self,
        token: &TokenSpec,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<HolderPage, SourceError> {
        let Some(creator) = &token.creator else {
            return Ok(HolderPage::default());
        };
        let request = HoldersRequest {
            creator: creator.clone(),
            cursor: cursor.unwrap_or_default().to_string(),
            num_to_fetch: page_size,
            is_dao_coin: true,
        };
        let response: HoldersResponse = self.post(HOLDERS_PATH, &request).await?;
        adapter::holder_page(response, token, page_size)
    }

    async fn ccv1_locked(&self) -> Result<f64, SourceError> {
        debug!("POST {}", self.graphql_url);
        let request = GraphQlRequest {
            query: CCV1_LOCKED_QUERY.to_string(),
        };
        let response = self
            .client
            .post(&self.graphql_url)
            .json(&request)
            .send()
            .await?;
        let body: GraphQlResponse<LockedAggregateData> = decode(response).await?;
        adapter::ccv1_locked(body)
    }
}

#[async_trait]
impl PriceOracle for DesoClient {
    async fn usd_price(&self, symbol: &str) -> Result<Option<f64>, SourceError> {
        if symbol != self.native_symbol {
            return Ok(None);
        }
        let response: ExchangeRateResponse = self.get(EXCHANGE_RATE_PATH).await?;
        Ok(adapter::usd_price(response))
    }
}

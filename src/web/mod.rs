//! HTTP API for taxon name resolution.
//!
//! This module serves the matching operations as JSON using Axum. Every
//! route is available under both `/api` and `/v2/api`.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on default port 8080
//! taxon-solver serve
//!
//! # Custom port and taxonomy
//! taxon-solver serve --port 3000 --taxonomy taxa.tsv.gz
//!
//! # Bind to all interfaces
//! taxon-solver serve --address 0.0.0.0
//! ```
//!
//! ## API Endpoints
//!
//! - `GET|POST /api/searchByClassification` - Resolve one search
//! - `POST /api/searchAllByClassification` - Resolve a list of nullable searches
//! - `GET /api/search?q=` - Resolve a scientific name
//! - `GET /api/searchByVernacularName?vernacularName=` - Resolve a common name
//! - `GET /api/getByTaxonID?taxonID=&follow=` - Look up an identifier
//! - `POST /api/getAllByTaxonID?taxonIDs=&follow=` - Look up a list of identifiers (or a JSON body of nullable ids)
//! - `GET /api/check?name=&rank=` - Whether a name is known at a rank
//! - `GET /api/autocomplete?q=&max=&includeSynonyms=` - Name suggestions
//! - `GET /api/searchForLsidById?id=` - Accepted identifier for an identifier
//! - `GET /api/searchForLSID?name=` - Identifier for a name
//! - `POST /api/getGuidsForTaxa` - Identifiers for a list of names
//! - `GET /api/getCommonNamesForLSID?lsid=&max=` - Vernacular names of a taxon
//! - `GET /api/groups` - Species groups
//! - `GET /api/health` - Liveness check
//!
//! Bulk endpoints answer with an array of the same length as their input.
//! Invalid requests get a 400 with an error body; unexpected failures get a
//! 500 whose body is a failed match result carrying the error.

pub mod server;

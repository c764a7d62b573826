//! In-memory stand-in for the modern CRM REST API.
//!
//! Covers the endpoints the compatibility client talks to: contacts
//! (listing, search, batch read/upsert), contact properties and groups,
//! contact lists with memberships, and owners. Cursors are stringified
//! offsets. Error bodies follow the remote envelope
//! `{"status": "error", "message": ..., "category": ...}`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

/// Batch endpoints reject more inputs than this.
pub const MAX_BATCH_INPUTS: usize = 100;
const DEFAULT_LIMIT: usize = 10;

pub type Db = Arc<RwLock<Crm>>;
type Params = HashMap<String, String>;

#[derive(Debug, Clone)]
struct Contact {
    id: u64,
    properties: Map<String, Value>,
    created_at: String,
    updated_at: String,
    revision: u64,
}

impl Contact {
    fn email(&self) -> Option<&str> {
        self.properties.get("email").and_then(Value::as_str)
    }

    /// Record body; `only` limits the returned properties.
    fn to_json(&self, only: Option<&[String]>) -> Value {
        let properties: Map<String, Value> = match only {
            Some(names) => names
                .iter()
                .filter_map(|n| self.properties.get(n).map(|v| (n.clone(), v.clone())))
                .collect(),
            None => self.properties.clone(),
        };
        json!({
            "id": self.id.to_string(),
            "properties": properties,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
            "archived": false,
        })
    }
}

#[derive(Debug, Clone)]
struct List {
    id: u64,
    name: String,
    processing_type: String,
    /// `(record id, membership timestamp)` in join order.
    members: Vec<(u64, String)>,
}

impl List {
    fn to_json(&self) -> Value {
        json!({
            "listId": self.id.to_string(),
            "name": self.name,
            "objectTypeId": "0-1",
            "processingType": self.processing_type,
            "size": self.members.len(),
        })
    }
}

/// Everything the fake remote stores.
#[derive(Debug, Default)]
pub struct Crm {
    contacts: BTreeMap<u64, Contact>,
    properties: Vec<Map<String, Value>>,
    groups: Vec<Map<String, Value>>,
    lists: BTreeMap<u64, List>,
    owners: Vec<Value>,
    last_contact_id: u64,
    last_list_id: u64,
    revision: u64,
}

impl Crm {
    /// Default property definitions, one group and three owners.
    pub fn seeded() -> Self {
        let mut crm = Crm::default();
        for name in ["email", "firstname", "lastname", "createdate", "lastmodifieddate"] {
            crm.properties.push(definition(name));
        }
        crm.groups.push(
            json!({"name": "contactinformation", "label": "Contact information", "archived": false})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        );
        crm.owners = (1..=3)
            .map(|i| {
                json!({
                    "id": i.to_string(),
                    "email": format!("owner{i}@example.com"),
                    "firstName": "Owner",
                    "lastName": i.to_string(),
                    "archived": false,
                })
            })
            .collect();
        crm
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn find_by_email(&self, email: &str) -> Option<u64> {
        self.contacts
            .values()
            .find(|c| c.email().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            .map(|c| c.id)
    }

    fn insert_contact(&mut self, properties: Map<String, Value>) -> &Contact {
        self.last_contact_id += 1;
        let id = self.last_contact_id;
        let now = now();
        let revision = self.next_revision();
        let mut contact = Contact {
            id,
            properties,
            created_at: now.clone(),
            updated_at: now.clone(),
            revision,
        };
        contact.properties.insert("createdate".into(), json!(now));
        contact.properties.insert("lastmodifieddate".into(), json!(now));
        contact.properties.insert("hs_object_id".into(), json!(id.to_string()));
        self.contacts.entry(id).or_insert(contact)
    }

    fn update_contact(&mut self, id: u64, properties: Map<String, Value>) -> Option<&Contact> {
        let revision = self.next_revision();
        let contact = self.contacts.get_mut(&id)?;
        let now = now();
        contact.properties.extend(properties);
        contact.properties.insert("lastmodifieddate".into(), json!(now));
        contact.updated_at = now;
        contact.revision = revision;
        Some(contact)
    }

    /// Resolve a member reference: a numeric id of a stored contact, or an email.
    fn member_id(&self, reference: &Value) -> Option<u64> {
        let id = match reference {
            Value::Number(n) => n.as_u64(),
            Value::String(s) if s.contains('@') => return self.find_by_email(s),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }?;
        self.contacts.contains_key(&id).then_some(id)
    }
}

fn definition(name: &str) -> Map<String, Value> {
    json!({
        "name": name,
        "label": name,
        "type": "string",
        "fieldType": "text",
        "groupName": "contactinformation",
        "archived": false,
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Error response in the remote's envelope.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let category = match self.status {
            StatusCode::NOT_FOUND => "OBJECT_NOT_FOUND",
            StatusCode::CONFLICT => "CONFLICT",
            _ => "VALIDATION_ERROR",
        };
        let body = json!({"status": "error", "message": self.message, "category": category});
        (self.status, Json(body)).into_response()
    }
}

type Reply = Result<Json<Value>, Failure>;

pub fn app() -> Router {
    app_with(Crm::seeded())
}

pub fn app_with(crm: Crm) -> Router {
    let db: Db = Arc::new(RwLock::new(crm));
    let api = Router::new()
        .route("/objects/contacts", get(list_contacts).post(create_contact))
        .route("/objects/contacts/search", post(search_contacts))
        .route("/objects/contacts/batch/read", post(batch_read))
        .route("/objects/contacts/batch/upsert", post(batch_upsert))
        .route(
            "/objects/contacts/{id}",
            get(get_contact).patch(update_contact).delete(delete_contact),
        )
        .route("/properties/contacts", get(list_properties).post(create_property))
        .route("/properties/contacts/groups", get(list_groups).post(create_group))
        .route(
            "/properties/contacts/groups/{name}",
            patch(update_group).delete(delete_group),
        )
        .route(
            "/properties/contacts/{name}",
            get(get_property).patch(update_property).delete(delete_property),
        )
        .route("/lists", post(create_list))
        .route("/lists/search", post(search_lists))
        .route("/lists/{id}", get(get_list).delete(delete_list))
        .route("/lists/{id}/memberships", get(memberships))
        .route("/lists/{id}/memberships/join-order", get(memberships_join_order))
        .route("/lists/{id}/memberships/add", put(add_members))
        .route("/lists/{id}/memberships/remove", put(remove_members))
        .route("/owners", get(list_owners));
    Router::new().nest("/crm/v3", api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Paging and request helpers
// ---------------------------------------------------------------------------

/// One page of `items` starting at offset `after`.
fn paginate(items: Vec<Value>, after: usize, limit: usize) -> Value {
    let total = items.len();
    let end = after.saturating_add(limit).min(total);
    let results: Vec<Value> = items.into_iter().skip(after).take(limit).collect();
    let mut body = json!({"results": results, "total": total});
    if end < total && end > after {
        body["paging"] = json!({"next": {"after": end.to_string()}});
    }
    body
}

fn query_number(query: &Params, name: &str, default: usize) -> usize {
    query
        .get(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn body_number(body: &Value, name: &str, default: usize) -> usize {
    match &body[name] {
        Value::Number(n) => n.as_u64().map_or(default, |n| n as usize),
        Value::String(s) => s.parse().unwrap_or(default),
        _ => default,
    }
}

/// Requested property names from a comma-separated query value.
fn query_properties(query: &Params) -> Option<Vec<String>> {
    query
        .get("properties")
        .filter(|p| !p.is_empty())
        .map(|p| p.split(',').map(str::to_string).collect())
}

fn body_properties(body: &Value) -> Option<Vec<String>> {
    body["properties"].as_array().filter(|p| !p.is_empty()).map(|p| {
        p.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn object(value: &Value, field: &str) -> Map<String, Value> {
    value[field].as_object().cloned().unwrap_or_default()
}

fn parse_id(id: &str, what: &str) -> Result<u64, Failure> {
    id.parse().map_err(|_| Failure::not_found(what))
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

async fn list_contacts(State(db): State<Db>, Query(query): Query<Params>) -> Json<Value> {
    let crm = db.read().await;
    let only = query_properties(&query);
    let items = crm
        .contacts
        .values()
        .map(|c| c.to_json(only.as_deref()))
        .collect();
    let mut body = paginate(
        items,
        query_number(&query, "after", 0),
        query_number(&query, "limit", DEFAULT_LIMIT),
    );
    if let Some(fields) = body.as_object_mut() {
        fields.remove("total");
    }
    Json(body)
}

async fn create_contact(
    State(db): State<Db>,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut crm = db.write().await;
    let properties = object(&input, "properties");
    if let Some(email) = properties.get("email").and_then(Value::as_str) {
        if let Some(existing) = crm.find_by_email(email) {
            return Err(Failure::conflict(format!(
                "Contact already exists. Existing ID: {existing}"
            )));
        }
    }
    let contact = crm.insert_contact(properties);
    info!(id = contact.id, "contact created");
    Ok((StatusCode::CREATED, Json(contact.to_json(None))))
}

async fn get_contact(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(query): Query<Params>,
) -> Reply {
    let crm = db.read().await;
    let key = if query.get("idProperty").map(String::as_str) == Some("email") {
        crm.find_by_email(&id)
    } else {
        id.parse().ok()
    };
    key.and_then(|k| crm.contacts.get(&k))
        .map(|c| Json(c.to_json(query_properties(&query).as_deref())))
        .ok_or_else(|| Failure::not_found("contact"))
}

async fn update_contact(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<Value>,
) -> Reply {
    let id = parse_id(&id, "contact")?;
    let mut crm = db.write().await;
    crm.update_contact(id, object(&input, "properties"))
        .map(|c| Json(c.to_json(None)))
        .ok_or_else(|| Failure::not_found("contact"))
}

async fn delete_contact(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode, Failure> {
    let id = parse_id(&id, "contact")?;
    let mut crm = db.write().await;
    crm.contacts
        .remove(&id)
        .ok_or_else(|| Failure::not_found("contact"))?;
    for list in crm.lists.values_mut() {
        list.members.retain(|(member, _)| *member != id);
    }
    Ok(StatusCode::NO_CONTENT)
}

fn batch_inputs(body: &Value) -> Result<Vec<Value>, Failure> {
    let inputs = body["inputs"].as_array().cloned().unwrap_or_default();
    if inputs.len() > MAX_BATCH_INPUTS {
        return Err(Failure::bad_request(format!(
            "Too many inputs: {} (limit {MAX_BATCH_INPUTS})",
            inputs.len()
        )));
    }
    Ok(inputs)
}

async fn batch_read(State(db): State<Db>, Json(input): Json<Value>) -> Reply {
    let inputs = batch_inputs(&input)?;
    let by_email = input["idProperty"].as_str() == Some("email");
    let only = body_properties(&input);
    let crm = db.read().await;
    let results: Vec<Value> = inputs
        .iter()
        .filter_map(|i| match &i["id"] {
            Value::String(s) if by_email => crm.find_by_email(s),
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        })
        .filter_map(|id| crm.contacts.get(&id))
        .map(|c| c.to_json(only.as_deref()))
        .collect();
    debug!(requested = inputs.len(), found = results.len(), "batch read");
    Ok(Json(json!({"status": "COMPLETE", "results": results})))
}

async fn batch_upsert(State(db): State<Db>, Json(input): Json<Value>) -> Reply {
    let inputs = batch_inputs(&input)?;
    let mut crm = db.write().await;
    let mut results = Vec::with_capacity(inputs.len());
    for item in &inputs {
        let properties = object(item, "properties");
        let target = match (&item["id"], item["idProperty"].as_str()) {
            (Value::String(email), Some("email")) => crm.find_by_email(email),
            (Value::String(id), _) => id
                .parse::<u64>()
                .ok()
                .filter(|id| crm.contacts.contains_key(id)),
            _ => None,
        }
        .or_else(|| {
            properties
                .get("email")
                .and_then(Value::as_str)
                .and_then(|e| crm.find_by_email(e))
        });
        let contact = match target {
            Some(id) => crm.update_contact(id, properties).map(|c| c.to_json(None)),
            None => {
                let mut properties = properties;
                let id_property = item["idProperty"].as_str();
                if let (Value::String(email), Some("email")) = (&item["id"], id_property) {
                    properties.entry("email").or_insert_with(|| json!(email));
                }
                Some(crm.insert_contact(properties).to_json(None))
            }
        };
        results.extend(contact);
    }
    Ok(Json(json!({"status": "COMPLETE", "results": results})))
}

fn matches_query(contact: &Contact, query: &str) -> bool {
    let needle = query.to_lowercase();
    needle.is_empty()
        || contact
            .properties
            .values()
            .filter_map(Value::as_str)
            .any(|v| v.to_lowercase().contains(&needle))
}

async fn search_contacts(State(db): State<Db>, Json(input): Json<Value>) -> Json<Value> {
    let crm = db.read().await;
    let query = input["query"].as_str().unwrap_or_default();
    let mut matched: Vec<&Contact> = crm
        .contacts
        .values()
        .filter(|c| matches_query(c, query))
        .collect();

    if let Some(sort) = input["sorts"].as_array().and_then(|s| s.first()) {
        let name = sort["propertyName"].as_str().unwrap_or_default();
        matched.sort_by_key(|c| {
            let value = c.properties.get(name).and_then(Value::as_str).unwrap_or_default();
            (value.to_string(), c.revision)
        });
        if sort["direction"].as_str() == Some("DESCENDING") {
            matched.reverse();
        }
    }

    let only = body_properties(&input);
    let items = matched.iter().map(|c| c.to_json(only.as_deref())).collect();
    Json(paginate(
        items,
        body_number(&input, "after", 0),
        body_number(&input, "limit", DEFAULT_LIMIT),
    ))
}

// ---------------------------------------------------------------------------
// Properties and groups
// ---------------------------------------------------------------------------

fn named(items: &[Map<String, Value>], name: &str) -> Option<usize> {
    items
        .iter()
        .position(|p| p.get("name").and_then(Value::as_str) == Some(name))
}

fn require_name(input: &Value) -> Result<String, Failure> {
    input["name"]
        .as_str()
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Failure::bad_request("name is required"))
}

async fn list_properties(State(db): State<Db>, Query(query): Query<Params>) -> Json<Value> {
    let archived = query.get("archived").map(String::as_str) == Some("true");
    let crm = db.read().await;
    let results: Vec<&Map<String, Value>> = crm
        .properties
        .iter()
        .filter(|p| p.get("archived").and_then(Value::as_bool).unwrap_or(false) == archived)
        .collect();
    Json(json!({"results": results}))
}

async fn create_property(
    State(db): State<Db>,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let name = require_name(&input)?;
    let mut crm = db.write().await;
    if named(&crm.properties, &name).is_some() {
        return Err(Failure::conflict(format!("Property named '{name}' already exists.")));
    }
    let mut property = definition(&name);
    property.extend(input.as_object().cloned().unwrap_or_default());
    crm.properties.push(property.clone());
    info!(property = %name, "property created");
    Ok((StatusCode::CREATED, Json(Value::Object(property))))
}

async fn get_property(State(db): State<Db>, Path(name): Path<String>) -> Reply {
    let crm = db.read().await;
    named(&crm.properties, &name)
        .map(|i| Json(Value::Object(crm.properties[i].clone())))
        .ok_or_else(|| Failure::not_found("property"))
}

async fn update_property(
    State(db): State<Db>,
    Path(name): Path<String>,
    Json(input): Json<Value>,
) -> Reply {
    let mut crm = db.write().await;
    let index = named(&crm.properties, &name).ok_or_else(|| Failure::not_found("property"))?;
    let property = &mut crm.properties[index];
    property.extend(input.as_object().cloned().unwrap_or_default());
    property.insert("name".into(), json!(name));
    Ok(Json(Value::Object(property.clone())))
}

async fn delete_property(
    State(db): State<Db>,
    Path(name): Path<String>,
) -> Result<StatusCode, Failure> {
    let mut crm = db.write().await;
    let index = named(&crm.properties, &name).ok_or_else(|| Failure::not_found("property"))?;
    crm.properties.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_groups(State(db): State<Db>) -> Json<Value> {
    let crm = db.read().await;
    Json(json!({"results": crm.groups}))
}

async fn create_group(
    State(db): State<Db>,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let name = require_name(&input)?;
    let mut crm = db.write().await;
    if named(&crm.groups, &name).is_some() {
        return Err(Failure::conflict(format!("Group named '{name}' already exists.")));
    }
    let mut group = input.as_object().cloned().unwrap_or_default();
    group.entry("archived").or_insert(json!(false));
    crm.groups.push(group.clone());
    Ok((StatusCode::CREATED, Json(Value::Object(group))))
}

async fn update_group(
    State(db): State<Db>,
    Path(name): Path<String>,
    Json(input): Json<Value>,
) -> Reply {
    let mut crm = db.write().await;
    let index = named(&crm.groups, &name).ok_or_else(|| Failure::not_found("group"))?;
    let group = &mut crm.groups[index];
    group.extend(input.as_object().cloned().unwrap_or_default());
    group.insert("name".into(), json!(name));
    Ok(Json(Value::Object(group.clone())))
}

async fn delete_group(
    State(db): State<Db>,
    Path(name): Path<String>,
) -> Result<StatusCode, Failure> {
    let mut crm = db.write().await;
    let index = named(&crm.groups, &name).ok_or_else(|| Failure::not_found("group"))?;
    crm.groups.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Lists and memberships
// ---------------------------------------------------------------------------

async fn search_lists(State(db): State<Db>, Json(input): Json<Value>) -> Json<Value> {
    let crm = db.read().await;
    let query = input["query"].as_str().unwrap_or_default().to_lowercase();
    let items = crm
        .lists
        .values()
        .filter(|l| query.is_empty() || l.name.to_lowercase().contains(&query))
        .map(List::to_json)
        .collect();
    Json(paginate(
        items,
        body_number(&input, "offset", 0),
        body_number(&input, "count", 20),
    ))
}

async fn create_list(State(db): State<Db>, Json(input): Json<Value>) -> Reply {
    let name = require_name(&input)?;
    if input["objectTypeId"].as_str().is_none() || input["processingType"].as_str().is_none() {
        return Err(Failure::bad_request("objectTypeId and processingType are required"));
    }
    let mut crm = db.write().await;
    if crm.lists.values().any(|l| l.name == name) {
        return Err(Failure::conflict(format!("A list named '{name}' already exists.")));
    }
    crm.last_list_id += 1;
    let list = List {
        id: crm.last_list_id,
        name,
        processing_type: input["processingType"].as_str().unwrap_or("MANUAL").to_string(),
        members: Vec::new(),
    };
    let body = list.to_json();
    info!(list = list.id, "list created");
    crm.lists.insert(list.id, list);
    Ok(Json(json!({"list": body})))
}

async fn get_list(State(db): State<Db>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id, "list")?;
    let crm = db.read().await;
    crm.lists
        .get(&id)
        .map(|l| Json(json!({"list": l.to_json()})))
        .ok_or_else(|| Failure::not_found("list"))
}

async fn delete_list(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode, Failure> {
    let id = parse_id(&id, "list")?;
    let mut crm = db.write().await;
    crm.lists
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| Failure::not_found("list"))
}

fn membership_page(list: &List, by_record_id: bool, query: &Params) -> Value {
    let mut members = list.members.clone();
    if by_record_id {
        members.sort_by_key(|(id, _)| *id);
    }
    let items = members
        .into_iter()
        .map(|(id, at)| json!({"recordId": id.to_string(), "membershipTimestamp": at}))
        .collect();
    let mut body = paginate(
        items,
        query_number(query, "after", 0),
        query_number(query, "limit", 100),
    );
    if let Some(fields) = body.as_object_mut() {
        fields.remove("total");
    }
    body
}

async fn memberships(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(query): Query<Params>,
) -> Reply {
    let id = parse_id(&id, "list")?;
    let crm = db.read().await;
    let list = crm.lists.get(&id).ok_or_else(|| Failure::not_found("list"))?;
    Ok(Json(membership_page(list, true, &query)))
}

async fn memberships_join_order(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(query): Query<Params>,
) -> Reply {
    let id = parse_id(&id, "list")?;
    let crm = db.read().await;
    let list = crm.lists.get(&id).ok_or_else(|| Failure::not_found("list"))?;
    Ok(Json(membership_page(list, false, &query)))
}

async fn add_members(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(references): Json<Vec<Value>>,
) -> Reply {
    let id = parse_id(&id, "list")?;
    let mut crm = db.write().await;
    let resolved: Vec<(Value, Option<u64>)> = references
        .into_iter()
        .map(|r| {
            let member = crm.member_id(&r);
            (r, member)
        })
        .collect();
    let list = crm.lists.get_mut(&id).ok_or_else(|| Failure::not_found("list"))?;
    let mut added = Vec::new();
    let mut missing = Vec::new();
    for (reference, member) in resolved {
        match member {
            Some(member) if list.members.iter().any(|(m, _)| *m == member) => {}
            Some(member) => {
                list.members.push((member, now()));
                added.push(member.to_string());
            }
            None => missing.push(reference),
        }
    }
    Ok(Json(json!({"recordIdsAdded": added, "recordIdsMissing": missing})))
}

async fn remove_members(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(references): Json<Vec<Value>>,
) -> Reply {
    let id = parse_id(&id, "list")?;
    let mut crm = db.write().await;
    let resolved: Vec<(Value, Option<u64>)> = references
        .into_iter()
        .map(|r| {
            let member = crm.member_id(&r);
            (r, member)
        })
        .collect();
    let list = crm.lists.get_mut(&id).ok_or_else(|| Failure::not_found("list"))?;
    let mut removed = Vec::new();
    let mut missing = Vec::new();
    for (reference, member) in resolved {
        match member.filter(|m| list.members.iter().any(|(id, _)| id == m)) {
            Some(member) => {
                list.members.retain(|(id, _)| *id != member);
                removed.push(member.to_string());
            }
            None => missing.push(reference),
        }
    }
    Ok(Json(json!({"recordIdsRemoved": removed, "recordIdsMissing": missing})))
}

// ---------------------------------------------------------------------------
// Owners
// ---------------------------------------------------------------------------

async fn list_owners(State(db): State<Db>, Query(query): Query<Params>) -> Json<Value> {
    let crm = db.read().await;
    let items = crm
        .owners
        .iter()
        .filter(|o| match query.get("email") {
            Some(email) => o["email"].as_str() == Some(email.as_str()),
            None => true,
        })
        .cloned()
        .collect();
    let mut body = paginate(
        items,
        query_number(&query, "after", 0),
        query_number(&query, "limit", 100),
    );
    if let Some(fields) = body.as_object_mut() {
        fields.remove("total");
    }
    Json(body)
}

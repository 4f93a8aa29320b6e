//! LDAP directory client implementation.

use crate::Result;
use async_trait::async_trait;
use ezdir_core::config::DirectorySettings;
use ezdir_core::Error;
use ezdir_ldif::{ChangeUnit, Entry, ModifyOp, DN, OBJECT_CLASS};
use ldap3::{LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use native_tls::{Certificate, TlsConnector};
use secrecy::ExposeSecret;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Attribute selection requesting every user attribute.
pub const ALL_ATTRIBUTES: &[&str] = &["*"];

/// Represents the search scope for LDAP queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// Raw search result before hydration into an LDIF entry.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute multimap as returned by the server.
    pub attributes: HashMap<String, Vec<String>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapSession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: Vec<String>,
    ) -> Result<Vec<RawEntry>>;
    async fn add(&mut self, dn: &str, attributes: Vec<(String, Vec<String>)>) -> Result<()>;
    async fn modify(&mut self, dn: &str, changes: &[ChangeUnit]) -> Result<()>;
    async fn delete(&mut self, dn: &str) -> Result<()>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// Directory client with pluggable LDAP backend.
///
/// Every operation opens a session, binds with the configured credentials
/// (or anonymously when none are configured), runs under the configured
/// operation timeout, and unbinds.
pub struct DirectoryClient {
    settings: Arc<DirectorySettings>,
    connector: Box<dyn LdapConnector>,
}

impl DirectoryClient {
    /// Creates a directory client that uses the real LDAP connector.
    #[must_use]
    pub fn new(settings: DirectorySettings) -> Self {
        let settings = Arc::new(settings);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(settings.clone()));
        Self {
            settings,
            connector,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_connector(
        settings: DirectorySettings,
        connector: Box<dyn LdapConnector>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            connector,
        }
    }

    /// Returns the client settings.
    #[must_use]
    pub fn settings(&self) -> &DirectorySettings {
        &self.settings
    }

    /// Searches the directory and hydrates the results as LDIF entries.
    ///
    /// Each result entry's `dn` reserved key is populated from the result
    /// DN. If `base` is `None`, the configured base DN is used.
    pub async fn search(
        &self,
        filter: &str,
        attributes: &[&str],
        base: Option<&str>,
    ) -> Result<Vec<Entry>> {
        let mut session = self.session().await?;
        let base = base.unwrap_or(&self.settings.base_dn);
        let attributes = attributes.iter().map(ToString::to_string).collect();
        let raw = self
            .execute_with_timeout(session.search(base, SearchScope::Subtree, filter, attributes))
            .await?;
        session.unbind().await?;
        Ok(raw.into_iter().map(hydrate_entry).collect())
    }

    /// Returns true if an entry exists at the given DN.
    ///
    /// A server-side search error on the base (typically `noSuchObject`)
    /// reads as absent.
    pub async fn exists(&self, dn: &str) -> Result<bool> {
        let mut session = self.session().await?;
        let result = self
            .execute_with_timeout(session.search(
                dn,
                SearchScope::Base,
                "(objectClass=*)",
                vec!["*".to_string()],
            ))
            .await;
        session.unbind().await?;

        match result {
            Ok(entries) => Ok(!entries.is_empty()),
            Err(Error::ExternalService { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Determines the next available uid number in the directory tree.
    pub async fn next_uidn(&self) -> Result<u32> {
        self.next_id(
            "(objectClass=posixAccount)",
            "uidNumber",
            self.settings.uid_start,
        )
        .await
    }

    /// Determines the next available gid number in the directory tree.
    pub async fn next_gidn(&self) -> Result<u32> {
        self.next_id(
            "(objectClass=posixGroup)",
            "gidNumber",
            self.settings.gid_start,
        )
        .await
    }

    async fn next_id(&self, filter: &str, attribute: &str, start: u32) -> Result<u32> {
        let entries = self.search(filter, &[attribute], None).await?;
        let highest = entries
            .iter()
            .filter_map(|entry| entry.first(attribute))
            .filter_map(|value| value.parse::<u32>().ok())
            .max();
        Ok(highest.map_or(start, |highest| highest + 1))
    }

    /// Returns the user entry with the given `uid`, if any.
    pub async fn get_user(&self, username: &str) -> Result<Option<Entry>> {
        self.find_one(self.settings.people_dn(), "uid", username)
            .await
    }

    /// Returns the group entry with the given `cn`, if any.
    pub async fn get_group(&self, groupname: &str) -> Result<Option<Entry>> {
        self.find_one(self.settings.group_dn(), "cn", groupname)
            .await
    }

    /// Returns the host entry with the given `cn`, if any.
    pub async fn get_host(&self, hostname: &str) -> Result<Option<Entry>> {
        self.find_one(self.settings.hosts_dn(), "cn", hostname).await
    }

    async fn find_one(&self, base: &str, index: &str, name: &str) -> Result<Option<Entry>> {
        let filter = format!("({index}={})", escape_filter_value(name));
        let entries = self.search(&filter, ALL_ATTRIBUTES, Some(base)).await?;
        Ok(entries.into_iter().next())
    }

    /// Performs an add operation for every entry in the sequence.
    ///
    /// The `dn` reserved key is detached from a copy of each entry and the
    /// remaining attributes (`objectClass` included) are sent to the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when an entry lacks a `dn` or an
    /// `objectClass`.
    pub async fn ldif_add(&self, entries: &[Entry]) -> Result<()> {
        let mut session = self.session().await?;
        for entry in entries {
            let mut copy = entry.clone();
            let dn = copy
                .remove(DN)
                .and_then(|values| values.into_iter().next())
                .filter(|dn| !dn.is_empty())
                .ok_or_else(|| Error::InvalidRequest("add entry is missing a dn".to_string()))?;
            if !copy.contains(OBJECT_CLASS) {
                return Err(Error::InvalidRequest(format!(
                    "add entry `{dn}` is missing objectClass"
                )));
            }

            debug!(dn = %dn, "adding directory entry");
            self.execute_with_timeout(session.add(&dn, copy.into_attributes()))
                .await?;
        }
        session.unbind().await?;
        Ok(())
    }

    /// Performs a modify operation for every entry in the sequence.
    ///
    /// Change units are applied in record order.
    pub async fn ldif_modify(&self, entries: &[Entry]) -> Result<()> {
        let mut session = self.session().await?;
        for entry in entries {
            let dn = entry.dn();
            if dn.is_empty() {
                return Err(Error::InvalidRequest(
                    "modify entry is missing a dn".to_string(),
                ));
            }

            debug!(dn = %dn, changes = entry.changes().len(), "modifying directory entry");
            self.execute_with_timeout(session.modify(dn, entry.changes()))
                .await?;
        }
        session.unbind().await?;
        Ok(())
    }

    /// Adds a single attribute value on an entry.
    pub async fn modify_add(&self, dn: &str, attribute: &str, value: &str) -> Result<()> {
        self.apply_change(
            dn,
            ChangeUnit::new(ModifyOp::Add, attribute, vec![value.to_string()]),
        )
        .await
    }

    /// Replaces all values of a single attribute on an entry.
    pub async fn modify_replace(&self, dn: &str, attribute: &str, value: &str) -> Result<()> {
        self.apply_change(
            dn,
            ChangeUnit::new(ModifyOp::Replace, attribute, vec![value.to_string()]),
        )
        .await
    }

    /// Deletes a single attribute value from an entry.
    ///
    /// When `value` is `None`, every value of the attribute is removed.
    pub async fn modify_delete(&self, dn: &str, attribute: &str, value: Option<&str>) -> Result<()> {
        let unit = match value {
            Some(value) => ChangeUnit::new(ModifyOp::Delete, attribute, vec![value.to_string()]),
            None => ChangeUnit::delete_all(attribute),
        };
        self.apply_change(dn, unit).await
    }

    /// Deletes an entry from the directory.
    pub async fn delete(&self, dn: &str) -> Result<()> {
        let mut session = self.session().await?;
        self.execute_with_timeout(session.delete(dn)).await?;
        session.unbind().await?;
        Ok(())
    }

    async fn apply_change(&self, dn: &str, unit: ChangeUnit) -> Result<()> {
        let mut session = self.session().await?;
        self.execute_with_timeout(session.modify(dn, std::slice::from_ref(&unit)))
            .await?;
        session.unbind().await?;
        Ok(())
    }

    pub(crate) async fn session(&self) -> Result<Box<dyn LdapSession>> {
        let mut session = self.connector.connect().await?;
        if let Some(bind_dn) = &self.settings.bind_dn {
            let password = self.settings.bind_password.as_ref().ok_or_else(|| {
                Error::ConfigError("bind_dn is set but bind_password is not".to_string())
            })?;
            self.execute_with_timeout(session.simple_bind(bind_dn, password.expose_secret()))
                .await?;
        }
        Ok(session)
    }

    pub(crate) async fn execute_with_timeout<F, T>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        timeout(self.settings.operation_timeout(), fut)
            .await
            .map_err(|_| Error::Timeout("directory operation timed out".to_string()))?
    }
}

/// Converts a raw search result into an LDIF entry.
///
/// The server returns attributes as an unordered multimap, so hydration
/// imposes a stable order: `objectClass` first, then the remaining
/// attributes sorted by name.
fn hydrate_entry(raw: RawEntry) -> Entry {
    let mut entry = Entry::new(raw.dn);
    let mut attributes = raw.attributes;

    if let Some(classes) = attributes.remove(OBJECT_CLASS) {
        for class in classes {
            entry.append(OBJECT_CLASS, class);
        }
    }

    let mut names: Vec<String> = attributes.keys().cloned().collect();
    names.sort();
    for name in names {
        if let Some(values) = attributes.remove(&name) {
            for value in values {
                entry.append(name.clone(), value);
            }
        }
    }

    entry
}

/// Escapes special characters in an LDAP filter value.
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Real LDAP connector backed by `ldap3`.
pub struct RealLdapConnector {
    settings: Arc<DirectorySettings>,
}

impl RealLdapConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(settings: Arc<DirectorySettings>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let conn_settings = build_ldap_settings(&self.settings)?;
        let (conn, ldap) = LdapConnAsync::with_settings(conn_settings, &self.settings.url)
            .await
            .map_err(map_ldap_error)?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapSession {
            inner: ldap,
            operation_timeout: self.settings.operation_timeout(),
        }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

impl RealLdapSession {
    async fn run<F, T>(&self, what: &str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = ldap3::result::Result<T>>,
    {
        timeout(self.operation_timeout, fut)
            .await
            .map_err(|_| Error::Timeout(format!("LDAP {what} timed out")))?
            .map_err(map_ldap_error)
    }
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let mut ldap = self.inner.clone();
        let result = self
            .run("bind", async move { ldap.simple_bind(dn, password).await })
            .await?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: Vec<String>,
    ) -> Result<Vec<RawEntry>> {
        let mut ldap = self.inner.clone();
        let base = base_dn.to_string();
        let filter = filter.to_string();
        let result = self
            .run("search", async move {
                ldap.search(&base, scope.into(), &filter, attributes).await
            })
            .await?;
        let (entries, _) = result.success().map_err(map_ldap_error)?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| RawEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn add(&mut self, dn: &str, attributes: Vec<(String, Vec<String>)>) -> Result<()> {
        let attrs: Vec<(String, HashSet<String>)> = attributes
            .into_iter()
            .map(|(name, values)| (name, values.into_iter().collect()))
            .collect();

        let mut ldap = self.inner.clone();
        let dn = dn.to_string();
        let result = self
            .run("add", async move { ldap.add(&dn, attrs).await })
            .await?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn modify(&mut self, dn: &str, changes: &[ChangeUnit]) -> Result<()> {
        let mods: Vec<Mod<String>> = changes
            .iter()
            .map(|unit| {
                let values: HashSet<String> = unit.values.iter().cloned().collect();
                match unit.op {
                    ModifyOp::Add => Mod::Add(unit.attribute.clone(), values),
                    ModifyOp::Replace => Mod::Replace(unit.attribute.clone(), values),
                    // An empty value set deletes every value of the attribute.
                    ModifyOp::Delete => Mod::Delete(unit.attribute.clone(), values),
                }
            })
            .collect();

        let mut ldap = self.inner.clone();
        let dn = dn.to_string();
        let result = self
            .run("modify", async move { ldap.modify(&dn, mods).await })
            .await?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        let mut ldap = self.inner.clone();
        let dn = dn.to_string();
        let result = self
            .run("delete", async move { ldap.delete(&dn).await })
            .await?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn unbind(&mut self) -> Result<()> {
        let mut ldap = self.inner.clone();
        self.run("unbind", async move { ldap.unbind().await }).await?;
        Ok(())
    }
}

fn build_ldap_settings(settings: &DirectorySettings) -> Result<LdapConnSettings> {
    let mut conn_settings =
        LdapConnSettings::new().set_conn_timeout(settings.connection_timeout());

    if !settings.tls_verify {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        conn_settings = conn_settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = &settings.tls_ca_cert {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::ConfigError(format!("invalid CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| Error::ConfigError(format!("failed to load CA certificate: {err}")))?;
        conn_settings = conn_settings.set_connector(connector);
    }

    Ok(conn_settings)
}

fn map_ldap_error(err: ldap3::LdapError) -> Error {
    Error::ExternalService {
        service: "ldap".to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ezdir_ldif::parse_str;

    fn sample_settings() -> DirectorySettings {
        DirectorySettings::new("ldap://ldap.example.com", "dc=example,dc=com")
            .unwrap()
            .with_people_dn("ou=People,dc=example,dc=com")
            .with_group_dn("ou=Group,dc=example,dc=com")
    }

    fn raw_user(uid: &str, uidn: &str) -> RawEntry {
        let mut attributes = HashMap::new();
        attributes.insert(
            OBJECT_CLASS.to_string(),
            vec!["posixAccount".to_string(), "inetOrgPerson".to_string()],
        );
        attributes.insert("uid".to_string(), vec![uid.to_string()]);
        attributes.insert("uidNumber".to_string(), vec![uidn.to_string()]);
        RawEntry {
            dn: format!("uid={uid},ou=People,dc=example,dc=com"),
            attributes,
        }
    }

    fn client_with_session(session: MockLdapSession) -> DirectoryClient {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(session)));
        DirectoryClient::with_connector(sample_settings(), Box::new(connector))
    }

    #[tokio::test]
    async fn search_hydrates_entries_with_dn_key() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|base, scope, filter, _| {
                base == "dc=example,dc=com"
                    && *scope == SearchScope::Subtree
                    && filter == "(objectClass=posixAccount)"
            })
            .returning(|_, _, _, _| Ok(vec![raw_user("jdoe", "10000")]));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        let entries = client
            .search("(objectClass=posixAccount)", ALL_ATTRIBUTES, None)
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.dn(), "uid=jdoe,ou=People,dc=example,dc=com");
        assert_eq!(entry.first(OBJECT_CLASS), Some("posixAccount"));
        assert_eq!(entry.first("uid"), Some("jdoe"));
    }

    #[tokio::test]
    async fn get_user_returns_none_when_absent() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|base, _, filter, _| {
                base == "ou=People,dc=example,dc=com" && filter == "(uid=ghost)"
            })
            .returning(|_, _, _, _| Ok(Vec::new()));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        assert!(client.get_user("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_user_escapes_filter_metacharacters() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|_, _, filter, _| filter == "(uid=j\\2adoe)")
            .returning(|_, _, _, _| Ok(Vec::new()));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        assert!(client.get_user("j*doe").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn next_uidn_is_max_plus_one() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .returning(|_, _, _, _| Ok(vec![raw_user("a", "10000"), raw_user("b", "10005")]));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        assert_eq!(client.next_uidn().await.unwrap(), 10_006);
    }

    #[tokio::test]
    async fn next_uidn_starts_at_configured_value() {
        let mut session = MockLdapSession::new();
        session.expect_search().returning(|_, _, _, _| Ok(Vec::new()));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        assert_eq!(client.next_uidn().await.unwrap(), 10_000);
    }

    #[tokio::test]
    async fn ldif_add_detaches_dn_and_sends_attributes() {
        let entries = parse_str(
            "dn: cn=test,ou=Group,dc=example,dc=com\n\
             objectClass: posixGroup\n\
             cn: test\n\
             gidNumber: 10001\n",
        )
        .unwrap();

        let mut session = MockLdapSession::new();
        session
            .expect_add()
            .withf(|dn, attributes| {
                dn == "cn=test,ou=Group,dc=example,dc=com"
                    && attributes.iter().all(|(name, _)| name != DN)
                    && attributes
                        .iter()
                        .any(|(name, values)| name == OBJECT_CLASS && values == &["posixGroup"])
                    && attributes
                        .iter()
                        .any(|(name, values)| name == "gidNumber" && values == &["10001"])
            })
            .returning(|_, _| Ok(()));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        client.ldif_add(&entries).await.unwrap();
    }

    #[tokio::test]
    async fn ldif_add_rejects_missing_objectclass() {
        let mut entry = Entry::new("cn=test,ou=Group,dc=example,dc=com");
        entry.append("cn", "test");

        let session = MockLdapSession::new();
        let client = client_with_session(session);
        let err = client.ldif_add(&[entry]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn ldif_modify_passes_change_units_in_order() {
        let entries = parse_str(
            "dn: uid=jdoe,ou=People,dc=example,dc=com\n\
             changetype: modify\n\
             replace: loginShell\n\
             loginShell: /bin/zsh\n\
             -\n\
             delete: mail\n\
             -\n",
        )
        .unwrap();

        let mut session = MockLdapSession::new();
        session
            .expect_modify()
            .withf(|dn, changes| {
                dn == "uid=jdoe,ou=People,dc=example,dc=com"
                    && changes.len() == 2
                    && changes[0].op == ModifyOp::Replace
                    && changes[1] == ChangeUnit::delete_all("mail")
            })
            .returning(|_, _| Ok(()));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        client.ldif_modify(&entries).await.unwrap();
    }

    #[tokio::test]
    async fn modify_delete_without_value_is_delete_all() {
        let mut session = MockLdapSession::new();
        session
            .expect_modify()
            .withf(|_, changes| changes == [ChangeUnit::delete_all("mail")])
            .returning(|_, _| Ok(()));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        client
            .modify_delete("uid=jdoe,ou=People,dc=example,dc=com", "mail", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn exists_reads_server_error_as_absent() {
        let mut session = MockLdapSession::new();
        session.expect_search().returning(|_, _, _, _| {
            Err(Error::ExternalService {
                service: "ldap".to_string(),
                message: "noSuchObject".to_string(),
            })
        });
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        assert!(!client.exists("cn=missing,dc=example,dc=com").await.unwrap());
    }

    #[tokio::test]
    async fn bind_uses_configured_credentials() {
        use secrecy::SecretString;

        let settings = sample_settings().with_credentials(
            "cn=Manager,dc=example,dc=com",
            SecretString::from("secret".to_string()),
        );

        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .withf(|dn, password| dn == "cn=Manager,dc=example,dc=com" && password == "secret")
            .returning(|_, _| Ok(()));
        session.expect_search().returning(|_, _, _, _| Ok(Vec::new()));
        session.expect_unbind().returning(|| Ok(()));

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(session)));

        let client = DirectoryClient::with_connector(settings, Box::new(connector));
        client
            .search("(objectClass=*)", ALL_ATTRIBUTES, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bind_without_password_is_config_error() {
        use secrecy::SecretString;

        let mut settings = sample_settings().with_credentials(
            "cn=Manager,dc=example,dc=com",
            SecretString::from("x".to_string()),
        );
        settings.bind_password = None;

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(|| Ok(Box::new(MockLdapSession::new())));

        let client = DirectoryClient::with_connector(settings, Box::new(connector));
        let err = client
            .search("(objectClass=*)", ALL_ATTRIBUTES, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn escape_filter_handles_metacharacters() {
        assert_eq!(escape_filter_value("a*b"), "a\\2ab");
        assert_eq!(escape_filter_value("(x)"), "\\28x\\29");
        assert_eq!(escape_filter_value("back\\slash"), "back\\5cslash");
        assert_eq!(escape_filter_value("plain"), "plain");
    }
}

//! Templated admin operations.
//!
//! Each operation assembles a replacement map, runs an LDIF template through
//! substitute → parse, and hands the resulting entries to the transport.
//! Replacement priority, lowest to highest: values derived from the
//! settings (search bases, home directory), extra placeholders from the
//! config file, operation-specific values, then caller overrides.

use crate::client::DirectoryClient;
use crate::dn::DistinguishedName;
use crate::password::ssha_password;
use crate::Result;
use ezdir_core::Error;
use ezdir_ldif::{parse, Entry, Replacements};
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;

impl DirectoryClient {
    /// Adds a group from an LDIF template.
    ///
    /// Allocates the next available gid when none is given. The template
    /// receives `groupname`, `gid`, and the base replacements.
    pub async fn add_group(
        &self,
        groupname: &str,
        gid: Option<u32>,
        template: impl AsRef<Path>,
        overrides: Option<&Replacements>,
    ) -> Result<Vec<Entry>> {
        let gid = match gid {
            Some(gid) => gid,
            None => self.next_gidn().await?,
        };

        let mut replacements = self.base_replacements();
        replacements.set("groupname", groupname);
        replacements.set("gid", gid);
        apply_overrides(&mut replacements, overrides);

        debug!(groupname, gid, "adding group from template");
        let entries = parse(template, Some(&replacements))?;
        self.ldif_add(&entries).await?;
        Ok(entries)
    }

    /// Adds a user from an LDIF template. Does not create or modify groups.
    ///
    /// `groupname` may be `None` when an explicit `gid` is given. The next
    /// available uid is allocated and the password is SSHA-hashed before it
    /// reaches the template as `user_password`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the named group does not exist and
    /// [`Error::InvalidRequest`] when neither a group nor a gid is given.
    pub async fn add_user(
        &self,
        username: &str,
        groupname: Option<&str>,
        password: &str,
        gid: Option<u32>,
        template: impl AsRef<Path>,
        overrides: Option<&Replacements>,
    ) -> Result<Vec<Entry>> {
        let uid = self.next_uidn().await?;
        let gid = match (gid, groupname) {
            (Some(gid), _) => gid,
            (None, Some(groupname)) => self.lookup_gid(groupname).await?,
            (None, None) => {
                return Err(Error::InvalidRequest(
                    "either a group name or an explicit gid is required".to_string(),
                ));
            }
        };

        let mut replacements = self.base_replacements();
        replacements.set("username", username);
        replacements.set("user_password", ssha_password(password));
        replacements.set("uid", uid);
        replacements.set("gid", gid);
        if let Some(groupname) = groupname {
            replacements.set("groupname", groupname);
        }
        apply_overrides(&mut replacements, overrides);

        debug!(username, uid, gid, "adding user from template");
        let entries = parse(template, Some(&replacements))?;
        self.ldif_add(&entries).await?;
        Ok(entries)
    }

    /// Adds an existing user to an existing group from an LDIF template.
    ///
    /// The user's DN is resolved and exposed to the template as `userdn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the user does not exist.
    pub async fn add_user_to_group(
        &self,
        username: &str,
        groupname: &str,
        template: impl AsRef<Path>,
        overrides: Option<&Replacements>,
    ) -> Result<Vec<Entry>> {
        let user = self
            .get_user(username)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user `{username}` does not exist")))?;

        let mut replacements = self.base_replacements();
        replacements.set("username", username);
        replacements.set("groupname", groupname);
        replacements.set("userdn", user.dn());
        apply_overrides(&mut replacements, overrides);

        debug!(username, groupname, "adding user to group from template");
        let entries = parse(template, Some(&replacements))?;
        self.ldif_modify(&entries).await?;
        Ok(entries)
    }

    /// Adds a host entry from an LDIF template.
    ///
    /// The fully-qualified hostname is derived from the base DN address
    /// (`dc=ezdir,dc=io` → `host.ezdir.io`) and may be overridden through
    /// the `hostname_fq` replacement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when `ip` is not a valid address.
    pub async fn add_host(
        &self,
        hostname: &str,
        ip: &str,
        template: impl AsRef<Path>,
        overrides: Option<&Replacements>,
    ) -> Result<Vec<Entry>> {
        let ip: IpAddr = ip
            .parse()
            .map_err(|_| Error::InvalidRequest(format!("invalid IP address `{ip}`")))?;
        let base = DistinguishedName::parse(&self.settings().base_dn)?;

        let mut replacements = self.base_replacements();
        replacements.set("hostname", hostname);
        replacements.set("hostname_fq", format!("{hostname}.{}", base.address()));
        replacements.set("ip", ip);
        apply_overrides(&mut replacements, overrides);

        debug!(hostname, %ip, "adding host from template");
        let entries = parse(template, Some(&replacements))?;
        self.ldif_add(&entries).await?;
        Ok(entries)
    }

    /// Replacements every template receives: the configured search bases,
    /// the home directory, and the extra placeholders from the config file.
    fn base_replacements(&self) -> Replacements {
        let settings = self.settings();
        let mut replacements = Replacements::new()
            .with("basedn", &settings.base_dn)
            .with("peopledn", settings.people_dn())
            .with("groupdn", settings.group_dn())
            .with("hostsdn", settings.hosts_dn())
            .with("homedir", &settings.home_dir);
        for (name, value) in &settings.placeholders {
            replacements.set(name.clone(), value);
        }
        replacements
    }

    async fn lookup_gid(&self, groupname: &str) -> Result<u32> {
        let group = self
            .get_group(groupname)
            .await?
            .ok_or_else(|| Error::NotFound(format!("group `{groupname}` does not exist")))?;
        group
            .first("gidNumber")
            .and_then(|value| value.parse::<u32>().ok())
            .ok_or_else(|| {
                Error::InvalidRequest(format!("group `{groupname}` has no usable gidNumber"))
            })
    }
}

fn apply_overrides(replacements: &mut Replacements, overrides: Option<&Replacements>) {
    if let Some(overrides) = overrides {
        replacements.extend_from(overrides);
    }
}

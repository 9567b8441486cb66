//! One probe pass over the default-router list of an interface.

use super::{MAX_DEFAULT_ROUTERS, RouterEntry, RouterTable};
use crate::error::{SendError, ValidationWarning};
use crate::iface::IfName;
use crate::probe::Prober;
use log::{debug, error};

/// Outcome of a scan pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Routers a probe was handed to the kernel for.
    pub probed: Vec<RouterEntry>,
    /// Eligible entries that were not safe to probe.
    pub rejected: Vec<ValidationWarning>,
    /// Probes the kernel refused to send.
    pub failed: Vec<SendError>,
}

impl ScanReport {
    /// Number of probes attempted, successful or not.
    pub fn attempted(&self) -> usize {
        self.probed.len() + self.failed.len()
    }

    /// Fold another pass's results into this one.
    pub fn merge(&mut self, other: ScanReport) {
        self.probed.extend(other.probed);
        self.rejected.extend(other.rejected);
        self.failed.extend(other.failed);
    }
}

/// Check that a router entry may be probed.
pub fn validate(entry: &RouterEntry) -> Result<(), ValidationWarning> {
    if !entry.address.is_unicast_link_local() {
        return Err(ValidationWarning::NotLinkLocal {
            address: entry.address,
            interface_index: entry.interface_index,
        });
    }
    Ok(())
}

/// Probe every link-local default router on `interface_filter`.
///
/// A zero filter selects nothing. Query failures are logged and yield an
/// empty report; rejected entries and failed sends are recorded and do not
/// stop the pass.
pub fn probe_default_routers<T, P>(table: &T, prober: &mut P, interface_filter: u32) -> ScanReport
where
    T: RouterTable + ?Sized,
    P: Prober + ?Sized,
{
    let mut report = ScanReport::default();

    let entries = match table.default_routers() {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to read default router list: {}", e);
            return report;
        }
    };

    if interface_filter == 0 {
        return report;
    }

    for entry in entries
        .into_iter()
        .take(MAX_DEFAULT_ROUTERS)
        .take_while(|e| e.interface_index != 0)
        .filter(|e| e.interface_index == interface_filter)
    {
        if let Err(warning) = validate(&entry) {
            error!("{}", warning);
            report.rejected.push(warning);
            continue;
        }

        match prober.probe(entry.address, entry.interface_index) {
            Ok(()) => report.probed.push(entry),
            Err(e) => report.failed.push(e),
        }
    }

    debug!(
        "Probed {} default router(s) on {} ({} rejected, {} failed)",
        report.probed.len(),
        IfName(interface_filter),
        report.rejected.len(),
        report.failed.len()
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use std::cell::Cell;
    use std::io;
    use std::net::Ipv6Addr;
    use std::rc::Rc;

    struct FixedTable(Vec<RouterEntry>);

    impl RouterTable for FixedTable {
        fn default_routers(&self) -> Result<Vec<RouterEntry>, QueryError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenTable {
        queried: Cell<bool>,
    }

    impl RouterTable for BrokenTable {
        fn default_routers(&self) -> Result<Vec<RouterEntry>, QueryError> {
            self.queried.set(true);
            Err(QueryError::Recv(io::Error::from_raw_os_error(libc::ENOBUFS)))
        }
    }

    /// Stands in for the query socket; counts live handles.
    struct QueryHandle(Rc<Cell<usize>>);

    impl QueryHandle {
        fn open(live: &Rc<Cell<usize>>) -> Self {
            live.set(live.get() + 1);
            Self(live.clone())
        }

        fn recv(&self, fail: bool) -> Result<Vec<RouterEntry>, QueryError> {
            if fail {
                return Err(QueryError::Recv(io::Error::from_raw_os_error(libc::EINTR)));
            }
            Ok(vec![RouterEntry::new(ll(1), 2), RouterEntry::new(ll(2), 2)])
        }
    }

    impl Drop for QueryHandle {
        fn drop(&mut self) {
            self.0.set(self.0.get() - 1);
        }
    }

    struct HandleTable {
        live: Rc<Cell<usize>>,
        opened: Cell<usize>,
        fail: bool,
    }

    impl HandleTable {
        fn new(fail: bool) -> Self {
            Self {
                live: Rc::new(Cell::new(0)),
                opened: Cell::new(0),
                fail,
            }
        }
    }

    impl RouterTable for HandleTable {
        fn default_routers(&self) -> Result<Vec<RouterEntry>, QueryError> {
            let handle = QueryHandle::open(&self.live);
            self.opened.set(self.opened.get() + 1);
            let routers = handle.recv(self.fail)?;
            Ok(routers)
        }
    }

    /// Records how many query handles were still live at each send.
    struct LiveAtSend {
        live: Rc<Cell<usize>>,
        seen: Vec<usize>,
    }

    impl Prober for LiveAtSend {
        fn probe(&mut self, _target: Ipv6Addr, _interface_index: u32) -> Result<(), SendError> {
            self.seen.push(self.live.get());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Ipv6Addr, u32)>,
        fail_on: Option<Ipv6Addr>,
    }

    impl Prober for Recorder {
        fn probe(&mut self, target: Ipv6Addr, interface_index: u32) -> Result<(), SendError> {
            self.calls.push((target, interface_index));
            if self.fail_on == Some(target) {
                return Err(SendError {
                    target,
                    interface_index,
                    source: io::Error::from_raw_os_error(libc::EHOSTUNREACH),
                });
            }
            Ok(())
        }
    }

    fn ll(last: u16) -> Ipv6Addr {
        Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, last)
    }

    #[test]
    fn test_validate() {
        assert!(validate(&RouterEntry::new(ll(1), 1)).is_ok());
        assert_eq!(
            validate(&RouterEntry::new(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), 4)),
            Err(ValidationWarning::NotLinkLocal {
                address: Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1),
                interface_index: 4,
            })
        );
        assert!(validate(&RouterEntry::new(Ipv6Addr::LOCALHOST, 1)).is_err());
        assert!(validate(&RouterEntry::new(Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 2), 1)).is_err());
    }

    #[test]
    fn test_mixed_table() {
        let table = FixedTable(vec![
            RouterEntry::new(ll(1), 2),
            RouterEntry::new(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), 2),
            RouterEntry::new(ll(2), 3),
        ]);
        let mut prober = Recorder::default();

        let report = probe_default_routers(&table, &mut prober, 2);

        assert_eq!(prober.calls, vec![(ll(1), 2)]);
        assert_eq!(report.probed, vec![RouterEntry::new(ll(1), 2)]);
        assert_eq!(report.rejected.len(), 1);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_zero_filter_probes_nothing() {
        let table = FixedTable(vec![RouterEntry::new(ll(1), 2), RouterEntry::new(ll(2), 3)]);
        let mut prober = Recorder::default();

        let report = probe_default_routers(&table, &mut prober, 0);

        assert!(prober.calls.is_empty());
        assert_eq!(report.attempted(), 0);
    }

    #[test]
    fn test_send_failure_does_not_stop_pass() {
        let table = FixedTable(vec![
            RouterEntry::new(ll(1), 2),
            RouterEntry::new(ll(2), 2),
            RouterEntry::new(ll(3), 2),
        ]);
        let mut prober = Recorder {
            fail_on: Some(ll(1)),
            ..Default::default()
        };

        let report = probe_default_routers(&table, &mut prober, 2);

        assert_eq!(prober.calls, vec![(ll(1), 2), (ll(2), 2), (ll(3), 2)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].target, ll(1));
        assert_eq!(report.probed.len(), 2);
        assert_eq!(report.attempted(), 3);
    }

    #[test]
    fn test_zero_interface_terminates_list() {
        let table = FixedTable(vec![
            RouterEntry::new(ll(1), 2),
            RouterEntry::new(ll(2), 0),
            RouterEntry::new(ll(3), 2),
        ]);
        let mut prober = Recorder::default();

        probe_default_routers(&table, &mut prober, 2);

        assert_eq!(prober.calls, vec![(ll(1), 2)]);
    }

    #[test]
    fn test_list_bounded() {
        let entries = (1..=(MAX_DEFAULT_ROUTERS as u16 + 5))
            .map(|i| RouterEntry::new(ll(i), 2))
            .collect();
        let mut prober = Recorder::default();

        let report = probe_default_routers(&FixedTable(entries), &mut prober, 2);

        assert_eq!(prober.calls.len(), MAX_DEFAULT_ROUTERS);
        assert_eq!(report.probed.len(), MAX_DEFAULT_ROUTERS);
    }

    #[test]
    fn test_query_failure_is_soft() {
        let table = BrokenTable {
            queried: Cell::new(false),
        };
        let mut prober = Recorder::default();

        let report = probe_default_routers(&table, &mut prober, 2);

        assert!(table.queried.get());
        assert!(prober.calls.is_empty());
        assert_eq!(report.attempted(), 0);
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn test_query_socket_released_on_failure() {
        let table = HandleTable::new(true);
        let mut prober = Recorder::default();

        let report = probe_default_routers(&table, &mut prober, 2);

        assert_eq!(table.opened.get(), 1);
        assert_eq!(table.live.get(), 0);
        assert!(prober.calls.is_empty());
        assert_eq!(report.attempted(), 0);
    }

    #[test]
    fn test_query_socket_released_before_sends() {
        let table = HandleTable::new(false);
        let mut sender = LiveAtSend {
            live: table.live.clone(),
            seen: Vec::new(),
        };

        let report = probe_default_routers(&table, &mut sender, 2);

        assert_eq!(sender.seen, vec![0, 0]);
        assert_eq!(table.opened.get(), 1);
        assert_eq!(table.live.get(), 0);
        assert_eq!(report.probed.len(), 2);
    }

    #[test]
    fn test_query_socket_released_with_zero_filter() {
        let table = HandleTable::new(false);
        let mut prober = Recorder::default();

        probe_default_routers(&table, &mut prober, 0);

        assert_eq!(table.opened.get(), 1);
        assert_eq!(table.live.get(), 0);
        assert!(prober.calls.is_empty());
    }
}

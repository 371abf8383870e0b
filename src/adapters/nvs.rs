//! NVS-backed configuration store.
//!
//! Implements [`ConfigPort`] over one postcard-encoded blob in the
//! `homie` namespace. A factory-fresh device has no blob and loads as
//! [`StoreError::NotFound`], which is what sends boot-mode selection into
//! the portal. Saves are validated first and committed atomically
//! (`nvs_commit` is all-or-nothing), so a rejected or failed save leaves
//! the previous record readable.
//!
//! The simulation backend keeps the encoded blob in memory and runs it
//! through the same postcard codec as the hardware path.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::config::PersistedConfig;
use crate::ports::{ConfigPort, StoreError};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "homie";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    blob: Option<Vec<u8>>,
}

impl NvsConfigStore {
    /// Create the store and initialise NVS flash.
    ///
    /// Returns `Err(StoreError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, StoreError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(StoreError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(StoreError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(StoreError::IoError);
            }
            info!("NvsConfigStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsConfigStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            blob: None,
        })
    }

    /// Store handle without touching flash. Used as the fallback when
    /// [`NvsConfigStore::new`] fails: reads report `IoError` (or `NotFound`
    /// in simulation) and writes fail, but the device still boots.
    pub fn unavailable() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            blob: None,
        }
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    fn decode(bytes: &[u8]) -> Result<PersistedConfig, StoreError> {
        postcard::from_bytes(bytes).map_err(|_| StoreError::Corrupted)
    }

    fn encode(config: &PersistedConfig) -> Result<Vec<u8>, StoreError> {
        postcard::to_allocvec(config).map_err(|_| StoreError::IoError)
    }
}

impl ConfigPort for NvsConfigStore {
    fn load(&self) -> Result<PersistedConfig, StoreError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match &self.blob {
                Some(bytes) => Self::decode(bytes),
                None => Err(StoreError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let key_cstr = b"config\0";
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                if size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ESP_FAIL);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }

                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let config = Self::decode(&bytes)?;
                    info!("NvsConfigStore: loaded config ({} bytes)", bytes.len());
                    Ok(config)
                }
                // Namespace or key absent: factory-fresh device.
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StoreError::NotFound),
                Err(e) => {
                    warn!("NvsConfigStore: NVS read error {}", e);
                    Err(StoreError::IoError)
                }
            }
        }
    }

    fn save(&mut self, config: &PersistedConfig) -> Result<(), StoreError> {
        if !config.is_coherent() {
            return Err(StoreError::ValidationFailed(
                "configured record is missing credentials or has a bad hostname",
            ));
        }

        let bytes = Self::encode(config)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.blob = Some(bytes);
            info!("NvsConfigStore: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let key_cstr = b"config\0";
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsConfigStore: config saved ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE => Err(StoreError::StorageFull),
                Err(e) => {
                    warn!("NvsConfigStore: NVS write error {}", e);
                    Err(StoreError::IoError)
                }
            }
        }
    }
}

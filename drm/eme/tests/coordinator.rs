use std::sync::Arc;

use data_encoding::BASE64;
use hex_literal::hex;

use drm_core::{ContentKey, PsshBox, SystemId};
use drm_eme::{
    ClearKeySystem, Completion, Coordinator, DeviceRegistry, EmeError, PlayReadySystem, Profile,
    SessionKey, SessionStore, clearkey,
};
use drm_playready::format::key::{CipherType, KeyType};
use drm_playready::format::pro::{PlayReadyHeader, PlayReadyRecord};
use drm_playready::format::utf16::decode_utf16le_strict;
use drm_playready::testing::{LicenseBuilder, element_text, license_response, well_formed};
use drm_playready::{CdmError, Device};

const HEADER: &str = "<WRMHEADER xmlns=\"http://schemas.microsoft.com/DRM/2007/03/PlayReadyHeader\" version=\"4.0.0.0\"><DATA><PROTECTINFO><KEYLEN>16</KEYLEN><ALGID>AESCTR</ALGID></PROTECTINFO><KID>4Rplb+TbNES8tGkNFWTEHA==</KID></DATA></WRMHEADER>";
const KID: [u8; 16] = hex!("6f651ae1dbe44434bcb4690d1564c41c");
const KEY: [u8; 16] = hex!("00112233445566778899aabbccddeeff");

struct Fixture {
    coordinator: Coordinator,
    desktop: Arc<Device>,
    tv: Arc<Device>,
}

fn fixture(profile: Profile) -> Fixture {
    let desktop = Arc::new(Device::generate(b"desktop".to_vec()));
    let tv = Arc::new(Device::generate(b"tv".to_vec()));
    let registry = DeviceRegistry::new(profile)
        .with_device("desktop", Arc::clone(&desktop))
        .with_device("tv", Arc::clone(&tv));
    let coordinator = Coordinator::new(Arc::new(SessionStore::new()))
        .with_system(PlayReadySystem::from_registry(registry))
        .with_system(ClearKeySystem);
    Fixture {
        coordinator,
        desktop,
        tv,
    }
}

fn default_fixture() -> Fixture {
    fixture(
        Profile::from_yaml(
            "default_device: desktop\nscopes:\n  tv.example.com: tv\n",
        )
        .unwrap(),
    )
}

fn init_data() -> Vec<u8> {
    let pro = PlayReadyHeader::new(vec![PlayReadyRecord::wrm_header(HEADER)]);
    PsshBox::new(SystemId::PlayReady, pro.to_bytes()).to_bytes()
}

/// Unwrap the SOAP challenge from a page-side key message.
fn soap_challenge(message: &[u8]) -> String {
    let text = decode_utf16le_strict(message).unwrap();
    let encoded = element_text(&text, "Challenge").unwrap();
    String::from_utf8(BASE64.decode(encoded.as_bytes()).unwrap()).unwrap()
}

fn license_for(device: &Device) -> Vec<u8> {
    let license = LicenseBuilder::new(device)
        .content_key(KID, CipherType::Ecc256, KEY)
        .build();
    license_response(&[license]).into_bytes()
}

#[test]
fn playready_session_end_to_end() {
    let f = default_fixture();
    let issued = f
        .coordinator
        .issue_challenge(SystemId::PlayReady, "www.example.com", &init_data())
        .unwrap();
    assert_eq!(issued.challenge.header, HEADER);

    let challenge = soap_challenge(&issued.challenge.message);
    assert!(well_formed(&challenge));
    assert_eq!(element_text(&challenge, "SignatureValue").unwrap().len(), 88);
    assert!(challenge.contains(HEADER));

    let done = f
        .coordinator
        .complete_session(&issued.session_id, &license_for(&f.desktop))
        .unwrap();
    match done {
        Completion::Keys {
            system,
            header,
            keys,
        } => {
            assert_eq!(system, SystemId::PlayReady);
            assert_eq!(header, HEADER);
            assert_eq!(
                keys,
                vec![SessionKey {
                    kid: KID,
                    key_type: Some(KeyType::Aes128Ctr),
                    cipher_type: Some(CipherType::Ecc256),
                    key: KEY.to_vec(),
                }]
            );
            assert_eq!(
                keys[0].to_content_key().unwrap(),
                ContentKey::from_aes128(KID, KEY)
            );
        }
        Completion::Passthrough(_) => panic!("session should be known"),
    }
    assert!(f.coordinator.store().is_empty());
}

#[test]
fn scope_selects_device() {
    let f = default_fixture();
    let issued = f
        .coordinator
        .issue_challenge(SystemId::PlayReady, "tv.example.com", &init_data())
        .unwrap();

    // A license for the other device cannot be opened by the scoped one.
    let err = f
        .coordinator
        .complete_session(&issued.session_id, &license_for(&f.desktop))
        .unwrap_err();
    assert!(matches!(err, EmeError::Cdm(_)));

    let issued = f
        .coordinator
        .issue_challenge(SystemId::PlayReady, "tv.example.com", &init_data())
        .unwrap();
    let done = f
        .coordinator
        .complete_session(&issued.session_id, &license_for(&f.tv))
        .unwrap();
    assert_eq!(done.keys().len(), 1);
}

#[test]
fn unknown_session_passes_through() {
    let f = default_fixture();
    let response = b"<opaque license bytes>".to_vec();
    let done = f.coordinator.complete_session("never-issued", &response).unwrap();
    assert_eq!(done, Completion::Passthrough(response));
}

#[test]
fn reissue_with_same_id_overwrites() {
    let f = default_fixture();
    let other = "<WRMHEADER xmlns=\"http://schemas.microsoft.com/DRM/2007/03/PlayReadyHeader\" version=\"4.0.0.0\"><DATA><KID>AAAAAAAAAAAAAAAAAAAAAA==</KID></DATA></WRMHEADER>";
    let other_init = {
        let pro = PlayReadyHeader::new(vec![PlayReadyRecord::wrm_header(other)]);
        PsshBox::new(SystemId::PlayReady, pro.to_bytes()).to_bytes()
    };

    f.coordinator
        .issue_challenge_with_id("page-session", SystemId::PlayReady, "a", &init_data())
        .unwrap();
    f.coordinator
        .issue_challenge_with_id("page-session", SystemId::PlayReady, "a", &other_init)
        .unwrap();
    assert_eq!(f.coordinator.store().len(), 1);

    let done = f
        .coordinator
        .complete_session("page-session", &license_for(&f.desktop))
        .unwrap();
    assert!(matches!(done, Completion::Keys { header, .. } if header == other));
}

#[test]
fn no_device_selected() {
    let f = fixture(Profile::default());
    let err = f
        .coordinator
        .issue_challenge(SystemId::PlayReady, "example.com", &init_data())
        .unwrap_err();
    assert!(matches!(err, EmeError::NoDeviceSelected(scope) if scope == "example.com"));
    assert!(f.coordinator.store().is_empty());
}

#[test]
fn bad_init_data_is_cdm_error() {
    let f = default_fixture();
    let err = f
        .coordinator
        .issue_challenge(SystemId::PlayReady, "example.com", &[0xAB; 40])
        .unwrap_err();
    assert!(matches!(err, EmeError::Cdm(CdmError::InitData(_))));
}

#[test]
fn soap_fault_consumes_session() {
    let f = default_fixture();
    let issued = f
        .coordinator
        .issue_challenge(SystemId::PlayReady, "example.com", &init_data())
        .unwrap();
    let fault = "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\"><soap:Body><soap:Fault><faultcode>soap:Server</faultcode><faultstring>Access denied</faultstring></soap:Fault></soap:Body></soap:Envelope>";
    let err = f
        .coordinator
        .complete_session(&issued.session_id, fault.as_bytes())
        .unwrap_err();
    assert!(matches!(err, EmeError::Cdm(CdmError::SoapFault(_))));
    assert!(f.coordinator.store().is_empty());
}

#[test]
fn clearkey_session() {
    let f = default_fixture();
    let issued = f
        .coordinator
        .issue_challenge(
            SystemId::ClearKey,
            "example.com",
            br#"{"kids":["4RplbvTbNES8tGkNFWTEHA"]}"#,
        )
        .unwrap();
    assert!(String::from_utf8_lossy(&issued.challenge.message).contains("4RplbvTbNES8tGkNFWTEHA"));

    let key = ContentKey::from_aes128(hex!("e11a656ef4db3444bcb4690d1564c41c"), KEY);
    let license = clearkey::build_license(std::slice::from_ref(&key));
    let done = f
        .coordinator
        .complete_session(&issued.session_id, license.as_bytes())
        .unwrap();
    assert_eq!(done.keys(), &[SessionKey::from(key)]);
    assert_eq!(done.keys()[0].cipher_type, None);
}

#[test]
fn concurrent_sessions() {
    let f = default_fixture();
    let init = init_data();
    let coordinator = &f.coordinator;
    let init = init.as_slice();
    let ids: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(move || {
                    coordinator
                        .issue_challenge(SystemId::PlayReady, "example.com", init)
                        .unwrap()
                        .session_id
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 8);
    assert_eq!(f.coordinator.store().len(), 8);

    let response = license_for(&f.desktop);
    std::thread::scope(|s| {
        for id in &ids {
            let response = &response;
            s.spawn(move || {
                let done = coordinator.complete_session(id, response).unwrap();
                assert_eq!(done.keys().len(), 1);
            });
        }
    });
    assert!(f.coordinator.store().is_empty());
}

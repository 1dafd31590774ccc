/*!
    P-256 key pairs and points.

    Everything above this module sees fixed-width big-endian encodings:
    32-byte private scalars and 64-byte `X || Y` points. The curve library
    stays behind [`CurvePoint`] and [`EccKey`].
*/

use core::fmt;

use p256::{
    AffinePoint, EncodedPoint, FieldBytes, NonZeroScalar, ProjectivePoint, PublicKey, Scalar,
    elliptic_curve::{
        PrimeField,
        group::Group,
        sec1::{FromEncodedPoint, ToEncodedPoint},
    },
};
use rand::rngs::OsRng;

use crate::error::{CdmError, CdmResult};

/**
    A point on P-256, possibly the identity.
*/
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CurvePoint(ProjectivePoint);

impl CurvePoint {
    pub fn generator() -> Self {
        Self(ProjectivePoint::GENERATOR)
    }

    /**
        Decode `X || Y`. Fails for coordinates that are not on the curve.
    */
    pub fn from_xy(xy: &[u8; 64]) -> CdmResult<Self> {
        let encoded = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&xy[..32]),
            FieldBytes::from_slice(&xy[32..]),
            false,
        );
        Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .map(|p| Self(p.into()))
            .ok_or_else(|| CdmError::EccOperation("point not on curve".into()))
    }

    pub fn from_slice(xy: &[u8]) -> CdmResult<Self> {
        let xy: &[u8; 64] = xy.try_into().map_err(|_| {
            CdmError::EccOperation(format!("point must be 64 bytes, got {}", xy.len()))
        })?;
        Self::from_xy(xy)
    }

    /**
        Encode as `X || Y`. The identity has no affine coordinates and
        fails.
    */
    pub fn to_xy(&self) -> CdmResult<[u8; 64]> {
        let encoded = self.0.to_affine().to_encoded_point(false);
        let (Some(x), Some(y)) = (encoded.x(), encoded.y()) else {
            return Err(CdmError::EccOperation("point at infinity".into()));
        };
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(x);
        out[32..].copy_from_slice(y);
        Ok(out)
    }

    pub fn x_bytes(&self) -> CdmResult<[u8; 32]> {
        let xy = self.to_xy()?;
        let mut x = [0u8; 32];
        x.copy_from_slice(&xy[..32]);
        Ok(x)
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_identity().into()
    }

    pub fn add(&self, other: &Self) -> Self {
        Self(self.0 + other.0)
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self(self.0 - other.0)
    }

    pub fn mul(&self, scalar: &Scalar) -> Self {
        Self(self.0 * scalar)
    }
}

impl fmt::Debug for CurvePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_xy() {
            Ok(xy) => write!(f, "CurvePoint({})", hex::encode(xy)),
            Err(_) => f.write_str("CurvePoint(identity)"),
        }
    }
}

/**
    A P-256 key pair. The public point is derived from the private scalar
    on construction and never stored independently.
*/
#[derive(Clone)]
pub struct EccKey {
    scalar: NonZeroScalar,
    public: [u8; 64],
}

impl EccKey {
    /**
        Generate a fresh key from the OS random source.
    */
    pub fn generate() -> Self {
        Self::from_scalar(NonZeroScalar::random(&mut OsRng))
    }

    /**
        Load a 32-byte big-endian private scalar. Zero and values not below
        the curve order are rejected rather than reduced.
    */
    pub fn from_private_bytes(bytes: &[u8]) -> CdmResult<Self> {
        if bytes.len() != 32 {
            return Err(CdmError::EccKeyParse(format!(
                "private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let scalar = NonZeroScalar::from_repr(*FieldBytes::from_slice(bytes));
        Option::<NonZeroScalar>::from(scalar)
            .map(Self::from_scalar)
            .ok_or_else(|| CdmError::EccKeyParse("private scalar out of range".into()))
    }

    fn from_scalar(scalar: NonZeroScalar) -> Self {
        let encoded = PublicKey::from_secret_scalar(&scalar).to_encoded_point(false);
        let mut public = [0u8; 64];
        // Uncompressed SEC1: 0x04 || X || Y
        public.copy_from_slice(&encoded.as_bytes()[1..]);
        Self { scalar, public }
    }

    pub fn private_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.scalar.to_repr());
        out
    }

    pub fn public_bytes(&self) -> &[u8; 64] {
        &self.public
    }

    pub fn public_point(&self) -> CurvePoint {
        CurvePoint(ProjectivePoint::GENERATOR * self.scalar.as_ref())
    }

    pub(crate) fn scalar(&self) -> &NonZeroScalar {
        &self.scalar
    }

    /**
        Private and public halves in the 96-byte PRD layout.
    */
    pub fn to_raw(&self) -> drm_playready_format::prd::RawEccKey {
        drm_playready_format::prd::RawEccKey {
            private_key: self.private_bytes(),
            public_key: self.public,
        }
    }
}

// Never print the private scalar.
impl fmt::Debug for EccKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EccKey")
            .field("public", &hex::encode(self.public))
            .finish_non_exhaustive()
    }
}

impl PartialEq for EccKey {
    fn eq(&self, other: &Self) -> bool {
        self.private_bytes() == other.private_bytes()
    }
}

impl Eq for EccKey {}

//! A library to serialize and deserialize Valve's VMF map file format.

mod attribute;

pub use attribute::Angle;
pub use attribute::Attribute;
pub use attribute::AttributeError;
pub use attribute::AttributeFlags;
pub use attribute::Color;
pub use attribute::Matrix;
pub use attribute::Vector3;
pub use attribute::Vector4;

mod element;

pub use element::Element;

pub mod keyvalues;

mod serializing;

pub use serializing::SerializationError;
pub use serializing::Serializer;
pub use serializing::deserialize;
pub use serializing::serialize;
pub use serializing::serializer;
pub use serializing::serializer_for_extension;

pub mod serializers;

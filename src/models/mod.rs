mod short_link;

pub use short_link::{
    CreateShortLinkDto, LinkInfoDto, PasswordDto, ShortLink, ShortLinkQueryParams,
    ShortLinkResponseDto, ShortenRequest,
};
